// * Headless rendering for JavaScript-heavy academic sites
// * A bounded pool of browser sessions; every session closes its page and
// * returns its permit on success, error, timeout and cancellation alike.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::constants::{NETWORK_IDLE_POLL_MS, NETWORK_IDLE_QUIET_POLLS};
use crate::config::PipelineSettings;
use crate::network::identity::{IdentityProfile, IdentityRotator};
use crate::ops::telemetry;

// * Stealth payload to mask WebDriver detection
const STEALTH_PAYLOAD: &str = r#"
(() => {
    // * Mask navigator.webdriver
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });

    // * Mask languages
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });

    // * Set hardwareConcurrency to 4 (common value)
    Object.defineProperty(navigator, 'hardwareConcurrency', {
        get: () => 4,
        configurable: true
    });

    // * Remove automation indicators from window
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
})();
"#;

// * Count of loaded resources; stable across polls means the network is idle
const RESOURCE_COUNT_JS: &str = "performance.getEntriesByType('resource').length";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Page navigation failed: {0}")]
    Navigation(String),

    #[error("Render timeout after {0}ms")]
    Timeout(u64),

    #[error("Content extraction failed: {0}")]
    ContentExtraction(String),

    #[error("All {0} render sessions busy")]
    Busy(usize),
}

/// What to render and as whom.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    pub identity: IdentityProfile,
}

/// Final DOM of a rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: String,
}

pub type AsyncResult<T> = Pin<Box<dyn Future<Output = Result<T, RenderError>> + Send>>;

/// Something that can turn a URL into rendered HTML.
pub trait PageRenderer: Send + Sync {
    fn render(&self, request: RenderRequest) -> AsyncResult<RenderedPage>;

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

struct BrowserState {
    browser: Browser,
    handler: tokio::task::JoinHandle<()>,
}

/// Chromium over CDP. The browser process is launched on first use and shared by all pages.
pub struct ChromiumRenderer {
    state: Arc<Mutex<Option<BrowserState>>>,
    headless: bool,
    page_timeout: Duration,
    settle: Duration,
}

impl ChromiumRenderer {
    pub fn new(headless: bool, page_timeout: Duration, settle: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
            headless,
            page_timeout,
            settle,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(settings.headless, settings.page_timeout(), settings.render_settle())
    }
}

async fn launch_browser(headless: bool) -> Result<BrowserState, RenderError> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu");
    if !headless {
        builder = builder.with_head();
    }
    let config = builder.build().map_err(RenderError::BrowserLaunch)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

    // * Spawn handler in background
    let handler = tokio::spawn(async move {
        while let Some(_event) = handler.next().await {
            // * Process browser events
        }
    });

    info!(headless, "Render browser launched");
    Ok(BrowserState { browser, handler })
}

async fn open_page(slot: &mut Option<BrowserState>, headless: bool) -> Result<Page, RenderError> {
    if slot.is_none() {
        *slot = Some(launch_browser(headless).await?);
    }
    let Some(state) = slot.as_ref() else {
        return Err(RenderError::BrowserLaunch("browser unavailable".to_string()));
    };

    let opened = state.browser.new_page("about:blank").await;
    match opened {
        Ok(page) => Ok(page),
        Err(e) => {
            // * A dead browser is relaunched on the next request
            warn!(error = %e, "Browser refused a new page, discarding it");
            if let Some(state) = slot.take() {
                state.handler.abort();
            }
            Err(RenderError::Navigation(e.to_string()))
        }
    }
}

impl PageRenderer for ChromiumRenderer {
    fn render(&self, request: RenderRequest) -> AsyncResult<RenderedPage> {
        let state = Arc::clone(&self.state);
        let headless = self.headless;
        let page_timeout = self.page_timeout;
        let settle = self.settle;

        Box::pin(async move {
            let page = {
                let mut slot = state.lock().await;
                open_page(&mut slot, headless).await?
            };

            let guard = PageGuard::new(page);
            let result = drive_page(guard.page(), &request, page_timeout, settle).await;
            guard.close().await;
            result
        })
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            if let Some(mut state) = state.lock().await.take() {
                let _ = state.browser.close().await;
                state.handler.abort();
                info!("Render browser shutdown complete");
            }
        })
    }
}

async fn drive_page(
    page: &Page,
    request: &RenderRequest,
    page_timeout: Duration,
    settle: Duration,
) -> Result<RenderedPage, RenderError> {
    let nav_err = |e: chromiumoxide::error::CdpError| RenderError::Navigation(e.to_string());

    page.execute(SetUserAgentOverrideParams::new(request.identity.user_agent))
        .await
        .map_err(nav_err)?;

    let headers: serde_json::Map<String, serde_json::Value> = request
        .identity
        .page_headers()
        .into_iter()
        .map(|(name, value)| (name.to_string(), serde_json::Value::from(value)))
        .collect();
    page.execute(SetExtraHttpHeadersParams::new(Headers::new(
        serde_json::Value::Object(headers),
    )))
    .await
    .map_err(nav_err)?;

    // * Stealth must run before any page script
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_PAYLOAD))
        .await
        .map_err(nav_err)?;

    let deadline = Instant::now() + page_timeout;
    match tokio::time::timeout(page_timeout, page.goto(request.url.as_str())).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(RenderError::Navigation(e.to_string())),
        Err(_) => return Err(RenderError::Timeout(page_timeout.as_millis() as u64)),
    }

    wait_for_network_idle(page, deadline).await;

    // * Bounded wait for late dynamic content
    tokio::time::sleep(settle.min(deadline.saturating_duration_since(Instant::now()))).await;

    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| request.url.clone());

    let html = page
        .content()
        .await
        .map_err(|e| RenderError::ContentExtraction(e.to_string()))?;

    Ok(RenderedPage { html, final_url })
}

async fn wait_for_network_idle(page: &Page, deadline: Instant) {
    let poll = Duration::from_millis(NETWORK_IDLE_POLL_MS);
    let mut last_count: Option<u64> = None;
    let mut quiet_polls = 0;

    while Instant::now() + poll < deadline {
        tokio::time::sleep(poll).await;

        let count = match page.evaluate(RESOURCE_COUNT_JS).await {
            Ok(result) => result.into_value::<u64>().ok(),
            Err(_) => None,
        };
        let Some(count) = count else { break };

        if last_count == Some(count) {
            quiet_polls += 1;
            if quiet_polls >= NETWORK_IDLE_QUIET_POLLS {
                debug!(resources = count, "Network idle");
                return;
            }
        } else {
            quiet_polls = 0;
            last_count = Some(count);
        }
    }
}

// * Owns a page until closed; a dropped guard closes the page in the background
struct PageGuard {
    page: Page,
    closed: bool,
}

impl PageGuard {
    fn new(page: Page) -> Self {
        Self { page, closed: false }
    }

    fn page(&self) -> &Page {
        &self.page
    }

    async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.page.clone().close().await {
            debug!(error = %e, "Page close failed");
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let page = self.page.clone();
            handle.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}

#[derive(Debug, Default)]
struct SessionCounters {
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Bounded pool of render sessions over a shared renderer.
pub struct RenderPool {
    renderer: Arc<dyn PageRenderer>,
    permits: Arc<Semaphore>,
    capacity: usize,
    queue_timeout: Duration,
    session_timeout: Duration,
    identities: IdentityRotator,
    counters: Arc<SessionCounters>,
}

impl RenderPool {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        capacity: usize,
        queue_timeout: Duration,
        session_timeout: Duration,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            renderer,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_timeout,
            session_timeout,
            identities: IdentityRotator::new(),
            counters: Arc::new(SessionCounters::default()),
        }
    }

    /// Pool over a lazily launched Chromium, sized from settings.
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(
            Arc::new(ChromiumRenderer::from_settings(settings)),
            settings.max_render_sessions,
            settings.render_queue_timeout(),
            settings.render_timeout(),
        )
    }

    /// Waits up to the queue timeout for a free session.
    pub async fn acquire(&self) -> Result<RenderSession, RenderError> {
        let permit = match tokio::time::timeout(
            self.queue_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            // * Closed semaphore means the pool is shutting down
            Ok(Err(_)) | Err(_) => {
                warn!(capacity = self.capacity, "Render pool busy");
                return Err(RenderError::Busy(self.capacity));
            }
        };

        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);
        telemetry::set_render_sessions_active(active);

        Ok(RenderSession {
            _permit: permit,
            renderer: Arc::clone(&self.renderer),
            counters: Arc::clone(&self.counters),
            timeout: self.session_timeout,
        })
    }

    /// Runs `f` with a session; the session is released whatever `f` returns.
    pub async fn with_session<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(RenderSession) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<RenderError>,
    {
        let session = self.acquire().await?;
        f(session).await
    }

    /// Renders one URL under the next rotated identity.
    pub async fn render_url(&self, url: &str) -> Result<RenderedPage, RenderError> {
        let request = RenderRequest {
            url: url.to_string(),
            identity: self.identities.next_profile(),
        };
        self.with_session(|session| async move { session.render(request).await })
            .await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously held sessions so far.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Refuses new sessions and closes the browser.
    pub async fn shutdown(&self) {
        self.permits.close();
        self.renderer.shutdown().await;
    }
}

/// One pool permit. Dropping the session frees the permit.
pub struct RenderSession {
    _permit: OwnedSemaphorePermit,
    renderer: Arc<dyn PageRenderer>,
    counters: Arc<SessionCounters>,
    timeout: Duration,
}

impl RenderSession {
    pub async fn render(&self, request: RenderRequest) -> Result<RenderedPage, RenderError> {
        let started = Instant::now();
        let url = request.url.clone();

        let result = match tokio::time::timeout(self.timeout, self.renderer.render(request)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(self.timeout.as_millis() as u64)),
        };

        match &result {
            Ok(_) => debug!(url = %url, elapsed_ms = started.elapsed().as_millis() as u64, "Page rendered"),
            Err(e) => warn!(url = %url, error = %e, "Render failed"),
        }
        result
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        let active = self.counters.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        telemetry::set_render_sessions_active(active);
    }
}
