// * arXiv abstract pages: static HTML, no rendering needed

use std::sync::Arc;
use tracing::debug;

use crate::network::client::FastClient;
use crate::network::identity::IdentityRotator;
use crate::sources::selectors::{parse_with_profile, SelectorProfile};
use crate::sources::{AsyncResult, RawExtraction, SourceAdapter, SourceError};

// * Relative links on abs pages resolve against the canonical host
pub const ARXIV_BASE: &str = "https://arxiv.org";

/// Parses an arXiv `/abs/` page.
pub fn parse_arxiv_abs(html: &str) -> Result<RawExtraction, SourceError> {
    parse_with_profile(html, ARXIV_BASE, &SelectorProfile::arxiv())
}

pub struct ArxivAdapter {
    client: FastClient,
    identities: Arc<IdentityRotator>,
}

impl ArxivAdapter {
    pub fn new(client: FastClient, identities: Arc<IdentityRotator>) -> Self {
        Self { client, identities }
    }
}

impl SourceAdapter for ArxivAdapter {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn extract(&self, url: &str) -> AsyncResult<RawExtraction> {
        let client = self.client.clone();
        let identity = self.identities.next_profile();
        let url = url.to_string();

        Box::pin(async move {
            let html = client.fetch(&url, &identity).await?;
            let raw = parse_arxiv_abs(&html)?;
            debug!(url = %url, title = %raw.title, authors = raw.authors.len(), "arXiv page parsed");
            Ok::<_, SourceError>(raw)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABS_PAGE: &str = r#"
        <html><head><title>[1706.03762] Attention Is All You Need</title></head>
        <body>
          <h1 class="title mathjax"><span class="descriptor">Title:</span>Attention Is All You Need</h1>
          <div class="authors"><span class="descriptor">Authors:</span>
            <a href="/a/vaswani_a_1">Ashish Vaswani</a>, <a href="/a/shazeer_n_1">Noam Shazeer</a>
          </div>
          <blockquote class="abstract mathjax">
            <span class="descriptor">Abstract:</span>The dominant sequence transduction models are based on complex recurrent or convolutional neural networks.
          </blockquote>
          <div class="extra-services">
            <a href="/pdf/1706.03762" class="abs-button download-pdf">View PDF</a>
          </div>
          <div class="submission-history">From: Ashish Vaswani [view email]
            <strong>[v1]</strong> Mon, 12 Jun 2017 17:57:34 UTC (1,102 KB)
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_abs_page() {
        let raw = parse_arxiv_abs(ABS_PAGE).unwrap();
        assert_eq!(raw.title, "Attention Is All You Need");
        assert_eq!(raw.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert!(raw.abstract_text.as_deref().unwrap().starts_with("The dominant sequence"));
        assert_eq!(raw.publication_year, Some(2017));
        assert_eq!(raw.pdf_link.as_deref(), Some("https://arxiv.org/pdf/1706.03762"));
        assert_eq!(raw.extraction_method, "arxiv");
    }

    #[test]
    fn test_citation_tags_when_markup_changes() {
        let html = r#"<html><head>
            <meta name="citation_title" content="Attention Is All You Need">
            <meta name="citation_author" content="Vaswani, Ashish">
            <meta name="citation_date" content="2017/06/12">
            <meta name="citation_pdf_url" content="https://arxiv.org/pdf/1706.03762">
        </head><body><div class="new-layout"></div></body></html>"#;

        let raw = parse_arxiv_abs(html).unwrap();
        assert_eq!(raw.title, "Attention Is All You Need");
        assert_eq!(raw.authors, vec!["Vaswani, Ashish"]);
        assert_eq!(raw.publication_year, Some(2017));
        assert_eq!(raw.pdf_link.as_deref(), Some("https://arxiv.org/pdf/1706.03762"));
    }
}
