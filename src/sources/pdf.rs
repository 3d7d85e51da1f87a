// * Direct PDF links: bounded download, then text extraction off the async runtime

use lazy_static::lazy_static;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::constants::{MAX_CONCURRENT_PDF_PARSES, MAX_PDF_BYTES, PDF_PARSE_TIMEOUT_SECS};
use crate::network::client::FastClient;
use crate::network::identity::IdentityRotator;
use crate::sources::{AsyncResult, RawExtraction, SourceAdapter, SourceError};

// * Title used when the document has no readable first line
pub const PDF_FALLBACK_TITLE: &str = "PDF Document";

// * The header may be preceded by junk, but only within the first KiB
const HEADER_WINDOW: usize = 1024;

lazy_static! {
    // * Shared by downloads and uploads
    static ref PARSE_SLOTS: Arc<Semaphore> = Arc::new(Semaphore::new(MAX_CONCURRENT_PDF_PARSES));
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    bytes
        .windows(4)
        .take(HEADER_WINDOW)
        .any(|window| window == b"%PDF")
}

// * Trims lines and collapses runs of blank lines into one paragraph break
fn clean_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .fold(Vec::new(), |mut acc: Vec<&str>, line| {
            if !line.is_empty() || acc.last().is_some_and(|l| !l.is_empty()) {
                acc.push(line);
            }
            acc
        })
        .join("\n")
        .trim()
        .to_string()
}

/// First non-blank line of extracted text.
pub fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Converts PDF bytes to text on the blocking pool, bounded by `timeout`.
///
/// At most `MAX_CONCURRENT_PDF_PARSES` conversions run at once. The deadline
/// covers the wait for a slot as well as the parse itself.
pub async fn pdf_to_text(bytes: Vec<u8>, timeout: Duration) -> Result<String, SourceError> {
    parse_with_slots(bytes, timeout, Arc::clone(&PARSE_SLOTS)).await
}

async fn parse_with_slots(
    bytes: Vec<u8>,
    timeout: Duration,
    slots: Arc<Semaphore>,
) -> Result<String, SourceError> {
    if !has_pdf_header(&bytes) {
        return Err(SourceError::Parse("not a PDF document".to_string()));
    }

    let parse = async move {
        let slot = slots.acquire_owned().await.map_err(|_| SourceError::Busy)?;
        // * The blocking thread cannot be cancelled; a parse past its deadline
        // * keeps its slot until it returns
        tokio::task::spawn_blocking(move || {
            let _slot = slot;
            pdf_extract::extract_text_from_mem(&bytes)
        })
        .await
        // * The extractor panics on some malformed files
        .map_err(|join| SourceError::Parse(format!("PDF extraction aborted: {}", join)))
    };

    let text = match tokio::time::timeout(timeout, parse).await {
        Ok(Ok(Ok(text))) => text,
        Ok(Ok(Err(e))) => return Err(SourceError::Parse(format!("PDF extraction failed: {}", e))),
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(SourceError::Timeout),
    };

    let text = clean_text(&text);
    if text.is_empty() {
        return Err(SourceError::Parse("PDF contains no extractable text".to_string()));
    }
    Ok(text)
}

pub struct PdfAdapter {
    client: FastClient,
    identities: Arc<IdentityRotator>,
    max_bytes: usize,
    parse_timeout: Duration,
}

impl PdfAdapter {
    pub fn new(client: FastClient, identities: Arc<IdentityRotator>) -> Self {
        Self {
            client,
            identities,
            max_bytes: MAX_PDF_BYTES,
            parse_timeout: Duration::from_secs(PDF_PARSE_TIMEOUT_SECS),
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Downloads a PDF and returns its text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let identity = self.identities.next_profile();
        let bytes = self.client.fetch_bytes(url, &identity, self.max_bytes).await?;
        debug!(url = %url, bytes = bytes.len(), "PDF downloaded");
        pdf_to_text(bytes, self.parse_timeout).await
    }

    fn to_extraction(url: &str, text: String) -> RawExtraction {
        let title = first_line(&text).unwrap_or(PDF_FALLBACK_TITLE).to_string();
        RawExtraction {
            title,
            full_text: Some(text),
            pdf_link: Some(url.to_string()),
            ..RawExtraction::new("pdf")
        }
    }
}

impl SourceAdapter for PdfAdapter {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extract(&self, url: &str) -> AsyncResult<RawExtraction> {
        let client = self.client.clone();
        let identity = self.identities.next_profile();
        let max_bytes = self.max_bytes;
        let parse_timeout = self.parse_timeout;
        let url = url.to_string();

        Box::pin(async move {
            let bytes = client.fetch_bytes(&url, &identity, max_bytes).await?;
            let text = pdf_to_text(bytes, parse_timeout).await.map_err(|e| {
                warn!(url = %url, error = %e, "PDF text extraction failed");
                e
            })?;
            Ok::<_, SourceError>(Self::to_extraction(&url, text))
        })
    }
}
