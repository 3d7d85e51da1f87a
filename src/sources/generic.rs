// * Catch-all adapter for arbitrary web pages
// * Static fetch first; on access denial the same URL is rendered and parsed identically.

use scraper::Html;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::renderer::RenderPool;
use crate::network::client::FastClient;
use crate::network::identity::IdentityRotator;
use crate::ops::telemetry;
use crate::refinery::content::{page_title, readable_text};
use crate::refinery::metadata::MetadataExtractor;
use crate::sources::selectors::resolve;
use crate::sources::{AsyncResult, RawExtraction, SourceAdapter, SourceError};

// * Title used when the page has neither <title> nor <h1>
pub const GENERIC_FALLBACK_TITLE: &str = "Web Page";

/// Parses any HTML page into a RawExtraction.
pub fn parse_generic(html: &str, base_url: &str, method: &str) -> RawExtraction {
    let document = Html::parse_document(html);
    let metadata = MetadataExtractor::extract_document(&document);

    let title = page_title(&document)
        .or_else(|| metadata.title.clone())
        .unwrap_or_else(|| GENERIC_FALLBACK_TITLE.to_string());

    let raw = RawExtraction {
        title,
        authors: metadata.authors,
        abstract_text: metadata.description,
        full_text: readable_text(&document),
        pdf_link: metadata
            .pdf_url
            .as_deref()
            .and_then(|href| resolve(base_url, href)),
        publication_year: None,
        doi: metadata.doi,
        journal: metadata.journal,
        extraction_method: method.to_string(),
    };
    raw.with_year(metadata.publication_year)
}

pub struct GenericAdapter {
    client: FastClient,
    identities: Arc<IdentityRotator>,
    pool: Arc<RenderPool>,
}

impl GenericAdapter {
    pub fn new(client: FastClient, identities: Arc<IdentityRotator>, pool: Arc<RenderPool>) -> Self {
        Self {
            client,
            identities,
            pool,
        }
    }
}

impl SourceAdapter for GenericAdapter {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extract(&self, url: &str) -> AsyncResult<RawExtraction> {
        let client = self.client.clone();
        let identity = self.identities.next_profile();
        let pool = Arc::clone(&self.pool);
        let url = url.to_string();

        Box::pin(async move {
            match client.fetch(&url, &identity).await {
                Ok(html) => Ok::<_, SourceError>(parse_generic(&html, &url, "generic_static")),
                Err(e) if e.is_access_denied() => {
                    warn!(url = %url, error = %e, "Access denied, escalating to headless render");
                    telemetry::record_escalation();
                    let page = pool.render_url(&url).await?;
                    info!(url = %url, final_url = %page.final_url, "Escalated render succeeded");
                    Ok(parse_generic(&page.html, &page.final_url, "generic_rendered"))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn may_render(&self) -> bool {
        true
    }
}
