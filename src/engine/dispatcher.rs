// * Adapter Dispatcher
// * Ordered (matcher, adapter) routes; the first matching route handles the URL.

use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::engine::renderer::RenderPool;
use crate::network::client::FastClient;
use crate::network::identity::IdentityRotator;
use crate::sources::{
    ArxivAdapter, GenericAdapter, PdfAdapter, RenderedSourceAdapter, SourceAdapter,
};

/// Predicate over a parsed URL.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMatcher {
    /// Host contains the fragment, e.g. "arxiv.org".
    HostContains(&'static str),
    /// Host contains the fragment and the path starts with the prefix.
    HostPathPrefix(&'static str, &'static str),
    /// Path ends with the suffix, case-insensitively.
    PathSuffix(&'static str),
    Any,
}

impl SourceMatcher {
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("").to_lowercase();
        match self {
            Self::HostContains(fragment) => host.contains(fragment),
            Self::HostPathPrefix(fragment, prefix) => {
                host.contains(fragment) && url.path().starts_with(prefix)
            }
            Self::PathSuffix(suffix) => url.path().to_lowercase().ends_with(suffix),
            Self::Any => true,
        }
    }
}

struct Route {
    matcher: SourceMatcher,
    adapter: Arc<dyn SourceAdapter>,
}

/// Routes URLs to adapters in priority order.
#[derive(Default)]
pub struct AdapterDispatcher {
    routes: Vec<Route>,
}

impl AdapterDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route; earlier routes take precedence.
    pub fn route(mut self, matcher: SourceMatcher, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.routes.push(Route { matcher, adapter });
        self
    }

    /// Standard route table:
    /// Google Scholar, ResearchGate, IEEE, arXiv PDF, arXiv, direct `.pdf`, generic.
    pub fn standard(
        client: FastClient,
        identities: Arc<IdentityRotator>,
        pool: Arc<RenderPool>,
        pdf: Arc<PdfAdapter>,
    ) -> Self {
        let arxiv: Arc<dyn SourceAdapter> =
            Arc::new(ArxivAdapter::new(client.clone(), Arc::clone(&identities)));
        let generic: Arc<dyn SourceAdapter> =
            Arc::new(GenericAdapter::new(client, identities, Arc::clone(&pool)));
        let pdf: Arc<dyn SourceAdapter> = pdf;

        Self::new()
            .route(
                SourceMatcher::HostContains("scholar.google"),
                Arc::new(RenderedSourceAdapter::google_scholar(Arc::clone(&pool))),
            )
            .route(
                SourceMatcher::HostContains("researchgate.net"),
                Arc::new(RenderedSourceAdapter::researchgate(Arc::clone(&pool))),
            )
            .route(
                SourceMatcher::HostContains("ieee.org"),
                Arc::new(RenderedSourceAdapter::ieee(pool)),
            )
            .route(SourceMatcher::HostPathPrefix("arxiv.org", "/pdf/"), Arc::clone(&pdf))
            .route(SourceMatcher::HostContains("arxiv.org"), arxiv)
            .route(SourceMatcher::PathSuffix(".pdf"), pdf)
            .route(SourceMatcher::Any, generic)
    }

    /// First adapter whose matcher accepts the URL.
    pub fn dispatch(&self, url: &Url) -> Option<Arc<dyn SourceAdapter>> {
        let route = self.routes.iter().find(|r| r.matcher.matches(url))?;
        debug!(url = %url, adapter = route.adapter.name(), "Adapter selected");
        Some(Arc::clone(&route.adapter))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
