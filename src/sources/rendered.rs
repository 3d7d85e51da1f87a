// * Academic sites that only serve content to a real browser:
// * Google Scholar, ResearchGate and IEEE Xplore

use std::sync::Arc;
use tracing::debug;

use crate::engine::renderer::RenderPool;
use crate::sources::selectors::{parse_with_profile, SelectorProfile};
use crate::sources::{AsyncResult, RawExtraction, SourceAdapter, SourceError};

/// Renders through the shared pool, then applies a selector profile.
pub struct RenderedSourceAdapter {
    name: &'static str,
    profile: Arc<SelectorProfile>,
    pool: Arc<RenderPool>,
}

impl RenderedSourceAdapter {
    pub fn new(name: &'static str, profile: SelectorProfile, pool: Arc<RenderPool>) -> Self {
        Self {
            name,
            profile: Arc::new(profile),
            pool,
        }
    }

    pub fn google_scholar(pool: Arc<RenderPool>) -> Self {
        Self::new("google_scholar", SelectorProfile::google_scholar(), pool)
    }

    pub fn researchgate(pool: Arc<RenderPool>) -> Self {
        Self::new("researchgate", SelectorProfile::researchgate(), pool)
    }

    pub fn ieee(pool: Arc<RenderPool>) -> Self {
        Self::new("ieee", SelectorProfile::ieee(), pool)
    }
}

impl SourceAdapter for RenderedSourceAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, url: &str) -> AsyncResult<RawExtraction> {
        let pool = Arc::clone(&self.pool);
        let profile = Arc::clone(&self.profile);
        let url = url.to_string();

        Box::pin(async move {
            let page = pool.render_url(&url).await?;
            let raw = parse_with_profile(&page.html, &page.final_url, &profile)?;
            debug!(url = %url, adapter = %profile.name, title = %raw.title, "Rendered page parsed");
            Ok::<_, SourceError>(raw)
        })
    }

    fn may_render(&self) -> bool {
        true
    }
}
