// * Source adapters: one extraction strategy per family of sites
// * Each adapter turns a URL into a RawExtraction; classification happens later.

pub mod arxiv;
pub mod generic;
pub mod pdf;
pub mod rendered;
pub mod selectors;

pub use arxiv::ArxivAdapter;
pub use generic::GenericAdapter;
pub use pdf::PdfAdapter;
pub use rendered::RenderedSourceAdapter;
pub use selectors::SelectorProfile;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::engine::renderer::RenderError;
use crate::network::errors::NetworkError;
use crate::refinery::metadata::plausible_year;

/// What one adapter recovered from one URL, before classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    /// May be empty; the orchestrator rejects untitled extractions.
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: Option<String>,
    pub full_text: Option<String>,
    /// Absolute URL of a PDF version, when the page links one.
    pub pdf_link: Option<String>,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    /// Journal or conference the work appeared in.
    pub journal: Option<String>,
    pub extraction_method: String,
}

impl RawExtraction {
    pub fn new(method: &str) -> Self {
        Self {
            extraction_method: method.to_string(),
            ..Default::default()
        }
    }

    /// Years outside the plausible range are dropped.
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.publication_year = year.and_then(plausible_year);
        self
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Fetch failed: {0}")]
    Fetch(NetworkError),

    #[error("Parse failed: {0}")]
    Parse(String),

    #[error("Source timed out")]
    Timeout,

    #[error("Render capacity exhausted")]
    Busy,

    #[error("Render failed: {0}")]
    Render(String),
}

impl SourceError {
    /// The site blocked us; a different access path may still work.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_access_denied())
    }
}

impl From<NetworkError> for SourceError {
    fn from(err: NetworkError) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Fetch(err)
        }
    }
}

impl From<RenderError> for SourceError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Timeout(_) => Self::Timeout,
            RenderError::Busy(_) => Self::Busy,
            other => Self::Render(other.to_string()),
        }
    }
}

/// Type alias for async adapter results
pub type AsyncResult<T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send>>;

/// A source-specific extraction strategy.
pub trait SourceAdapter: Send + Sync {
    /// Stable name used in logs, metrics and provenance.
    fn name(&self) -> &'static str;

    fn extract(&self, url: &str) -> AsyncResult<RawExtraction>;

    /// Whether extraction may go through the headless browser (longer deadline).
    fn may_render(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds() {
        assert_eq!(RawExtraction::new("x").with_year(Some(2021)).publication_year, Some(2021));
        assert_eq!(RawExtraction::new("x").with_year(Some(999)).publication_year, None);
        assert_eq!(RawExtraction::new("x").with_year(Some(3001)).publication_year, None);
    }

    #[test]
    fn test_error_mapping() {
        assert!(SourceError::from(NetworkError::HardBan(403)).is_access_denied());
        assert!(SourceError::from(NetworkError::SoftBan("captcha".into())).is_access_denied());
        assert!(!SourceError::from(NetworkError::Status(500)).is_access_denied());
        assert!(matches!(SourceError::from(RenderError::Busy(2)), SourceError::Busy));
        assert!(matches!(SourceError::from(RenderError::Timeout(10)), SourceError::Timeout));
    }
}
