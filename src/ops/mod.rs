// * Operations: structured logging and Prometheus metrics

pub mod telemetry;

// * Re-exports for convenient access
pub use telemetry::{
    get_metrics_string, init_tracing, init_tracing_pretty, init_tracing_with_level,
    record_escalation, record_extraction, record_pdf_bytes, record_saved,
    set_render_sessions_active, start_metrics_server, start_metrics_server_default,
    MetricsServerHandle,
};
