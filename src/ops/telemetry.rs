// * Telemetry - JSON Logging and Prometheus Metrics
// * Structured logging and extraction metrics for production observability

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::constants::DEFAULT_METRICS_PORT;

// * Filter used when RUST_LOG is unset
const DEFAULT_FILTER: &str = "scholar_flow=debug,info";

lazy_static! {
    // * Extractions by adapter and outcome
    pub static ref EXTRACTIONS_TOTAL: CounterVec = register_counter_vec!(
        "scholar_extractions_total",
        "Total extractions by adapter and status",
        &["adapter", "status"]
    ).unwrap();

    // * End-to-end extraction duration
    pub static ref EXTRACTION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "scholar_extraction_duration_seconds",
        "Extraction duration in seconds by adapter",
        &["adapter"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // * Render sessions currently held
    pub static ref RENDER_SESSIONS_ACTIVE: Gauge = register_gauge!(
        "scholar_render_sessions_active",
        "Number of headless render sessions in use"
    ).unwrap();

    // * Static fetches that fell back to rendering
    pub static ref ESCALATIONS_TOTAL: Counter = register_counter!(
        "scholar_escalations_total",
        "Static fetches escalated to headless rendering"
    ).unwrap();

    // * PDF bytes pulled over the network
    pub static ref PDF_BYTES_DOWNLOADED: Counter = register_counter!(
        "scholar_pdf_bytes_downloaded_total",
        "Total PDF bytes downloaded"
    ).unwrap();

    // * Records written by source
    pub static ref RECORDS_SAVED_TOTAL: CounterVec = register_counter_vec!(
        "scholar_records_saved_total",
        "Reference records saved by source",
        &["source"]
    ).unwrap();
}

/// Initializes the tracing subscriber with JSON formatting
///
/// # Example
/// ```ignore
/// use scholar_flow::ops::telemetry;
///
/// telemetry::init_tracing();
/// tracing::info!(url = "https://arxiv.org/abs/1706.03762", "Extracting reference");
/// ```
pub fn init_tracing() {
    init_tracing_with_level(DEFAULT_FILTER);
}

/// Initializes tracing with custom log level
pub fn init_tracing_with_level(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initializes tracing with pretty formatting (for development)
pub fn init_tracing_pretty() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().pretty())
        .init();
}

/// Metrics server handle for graceful shutdown
pub struct MetricsServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    running: Arc<AtomicBool>,
}

impl MetricsServerHandle {
    /// Signals the metrics server to shut down
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Starts the Prometheus metrics HTTP server on the specified port
///
/// Serves `/metrics`, `/health` and `/ready`.
pub async fn start_metrics_server(port: u16) -> MetricsServerHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tokio::spawn(async move {
        let make_svc = hyper::service::make_service_fn(|_conn| async {
            Ok::<_, std::convert::Infallible>(hyper::service::service_fn(handle_metrics_request))
        });

        let server = match hyper::Server::try_bind(&addr) {
            Ok(builder) => builder.serve(make_svc).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            }),
            Err(e) => {
                tracing::error!(port = port, error = %e, "Metrics server bind failed");
                running_clone.store(false, Ordering::Relaxed);
                return;
            }
        };

        tracing::info!(port = port, "Metrics server started");

        if let Err(e) = server.await {
            tracing::error!(error = %e, "Metrics server error");
        }

        running_clone.store(false, Ordering::Relaxed);
        tracing::info!("Metrics server stopped");
    });

    MetricsServerHandle {
        shutdown_tx: Some(shutdown_tx),
        running,
    }
}

/// Starts the metrics server on the default port (9000)
pub async fn start_metrics_server_default() -> MetricsServerHandle {
    start_metrics_server(DEFAULT_METRICS_PORT).await
}

fn text_response(status: u16, body: impl Into<hyper::Body>) -> hyper::Response<hyper::Body> {
    let mut response = hyper::Response::new(body.into());
    *response.status_mut() =
        hyper::StatusCode::from_u16(status).unwrap_or(hyper::StatusCode::INTERNAL_SERVER_ERROR);
    response
}

async fn handle_metrics_request(
    req: hyper::Request<hyper::Body>,
) -> Result<hyper::Response<hyper::Body>, std::convert::Infallible> {
    let response = match req.uri().path() {
        "/metrics" => {
            let encoder = TextEncoder::new();
            let mut buffer = Vec::new();
            match encoder.encode(&prometheus::gather(), &mut buffer) {
                Ok(()) => {
                    let mut response = text_response(200, buffer);
                    if let Ok(value) = hyper::header::HeaderValue::from_str(encoder.format_type()) {
                        response.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
                    }
                    response
                }
                Err(e) => text_response(500, e.to_string()),
            }
        }
        "/health" => text_response(200, "OK"),
        "/ready" => text_response(200, "READY"),
        _ => text_response(404, "Not Found"),
    };
    Ok(response)
}

/// Returns the current metrics as a string
pub fn get_metrics_string() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Records an extraction outcome and its duration
pub fn record_extraction(adapter: &str, status: &str, seconds: f64) {
    EXTRACTIONS_TOTAL.with_label_values(&[adapter, status]).inc();
    EXTRACTION_DURATION_SECONDS
        .with_label_values(&[adapter])
        .observe(seconds);
}

pub fn set_render_sessions_active(count: usize) {
    RENDER_SESSIONS_ACTIVE.set(count as f64);
}

/// Records a static fetch handed over to the renderer
pub fn record_escalation() {
    ESCALATIONS_TOTAL.inc();
}

pub fn record_pdf_bytes(bytes: usize) {
    PDF_BYTES_DOWNLOADED.inc_by(bytes as f64);
}

pub fn record_saved(source: &str) {
    RECORDS_SAVED_TOTAL.with_label_values(&[source]).inc();
}
