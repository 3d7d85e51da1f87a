// * Extraction Orchestrator
// * URL in, classified ReferenceDraft out. Each call is independent; the only
// * shared state is the read-only classifier and the render pool.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::settings::PipelineSettings;
use crate::engine::dispatcher::AdapterDispatcher;
use crate::engine::normalization::canonicalize_url;
use crate::engine::renderer::RenderPool;
use crate::network::client::FastClient;
use crate::network::identity::IdentityRotator;
use crate::ops::telemetry;
use crate::persistence::schema::{ExtractionMetadata, ReferenceDraft, ReferenceRecord, ReferenceSource};
use crate::persistence::store::{ReferenceStore, StoreError};
use crate::refinery::{DisciplineModel, DocumentType, Evidence, Refinery, TextProfile};
use crate::sources::{PdfAdapter, RawExtraction, SourceError};

/// Coarse error classes for callers mapping failures onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    SourceUnavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Adapter failure, deadline expiry (`SourceError::Timeout`) or a full
    /// render pool (`SourceError::Busy`).
    #[error("Extraction failed for {url}: {cause}")]
    Extraction { url: String, cause: SourceError },

    #[error("Storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Storage(StoreError::InvalidInput(_)) => ErrorKind::InvalidInput,
            Self::Extraction { .. } => ErrorKind::SourceUnavailable,
            Self::Storage(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Extraction { cause, .. } => !matches!(cause, SourceError::Parse(_)),
            _ => false,
        }
    }
}

pub struct Orchestrator {
    dispatcher: AdapterDispatcher,
    model: Arc<DisciplineModel>,
    pdf: Arc<PdfAdapter>,
    pool: Option<Arc<RenderPool>>,
    static_timeout: Duration,
    render_timeout: Duration,
}

impl Orchestrator {
    /// Orchestrator over a custom route table.
    pub fn new(
        dispatcher: AdapterDispatcher,
        model: Arc<DisciplineModel>,
        pdf: Arc<PdfAdapter>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            dispatcher,
            model,
            pdf,
            pool: None,
            static_timeout: settings.static_timeout(),
            render_timeout: settings.render_timeout(),
        }
    }

    /// Standard route table over the given client and render pool.
    pub fn from_parts(
        settings: &PipelineSettings,
        model: Arc<DisciplineModel>,
        client: FastClient,
        pool: Arc<RenderPool>,
    ) -> Self {
        let identities = Arc::new(IdentityRotator::new());
        let pdf = Arc::new(
            PdfAdapter::new(client.clone(), Arc::clone(&identities))
                .with_max_bytes(settings.max_pdf_bytes),
        );
        let dispatcher =
            AdapterDispatcher::standard(client, identities, Arc::clone(&pool), Arc::clone(&pdf));

        let mut orchestrator = Self::new(dispatcher, model, pdf, settings);
        orchestrator.pool = Some(pool);
        orchestrator
    }

    /// Production wiring: HTTP client plus a Chromium-backed render pool.
    pub fn from_settings(
        settings: &PipelineSettings,
        model: Arc<DisciplineModel>,
    ) -> Result<Self, PipelineError> {
        let client = FastClient::new(settings.static_timeout())
            .map_err(|e| PipelineError::Internal(format!("HTTP client setup failed: {}", e)))?;
        let pool = Arc::new(RenderPool::from_settings(settings));
        Ok(Self::from_parts(settings, model, client, pool))
    }

    /// Extracts a URL and classifies the result. Nothing is persisted.
    #[instrument(skip(self), fields(adapter = tracing::field::Empty))]
    pub async fn extract_and_classify(
        &self,
        url: &str,
        type_hint: Option<DocumentType>,
    ) -> Result<ReferenceDraft, PipelineError> {
        let canonical = canonicalize_url(url).map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
        let url = canonical.to_string();

        let adapter = self
            .dispatcher
            .dispatch(&canonical)
            .ok_or_else(|| PipelineError::Internal(format!("no adapter accepts {}", url)))?;
        tracing::Span::current().record("adapter", adapter.name());

        let deadline = if adapter.may_render() {
            self.render_timeout
        } else {
            self.static_timeout
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(deadline, adapter.extract(&url)).await;
        let elapsed = started.elapsed();

        let raw = match outcome {
            Ok(Ok(raw)) => {
                telemetry::record_extraction(adapter.name(), "success", elapsed.as_secs_f64());
                raw
            }
            Ok(Err(cause)) => {
                let status = match cause {
                    SourceError::Timeout => "timeout",
                    SourceError::Busy => "busy",
                    _ => "error",
                };
                telemetry::record_extraction(adapter.name(), status, elapsed.as_secs_f64());
                warn!(url = %url, adapter = adapter.name(), error = %cause, "Extraction failed");
                return Err(PipelineError::Extraction { url, cause });
            }
            Err(_) => {
                telemetry::record_extraction(adapter.name(), "timeout", elapsed.as_secs_f64());
                warn!(url = %url, adapter = adapter.name(), deadline_ms = deadline.as_millis() as u64, "Extraction deadline exceeded");
                return Err(PipelineError::Extraction {
                    url,
                    cause: SourceError::Timeout,
                });
            }
        };

        if raw.title.trim().is_empty() {
            return Err(PipelineError::Extraction {
                url,
                cause: SourceError::Parse("no title found".to_string()),
            });
        }

        let raw = self.attach_pdf_text(raw).await;
        let draft = self.assemble(&url, raw, type_hint);

        info!(
            url = %url,
            adapter = adapter.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            discipline = %draft.discipline,
            document_type = %draft.document_type,
            "Reference extracted"
        );
        Ok(draft)
    }

    /// Extracts, classifies and saves.
    pub async fn ingest_url(
        &self,
        url: &str,
        type_hint: Option<DocumentType>,
        store: &dyn ReferenceStore,
    ) -> Result<ReferenceRecord, PipelineError> {
        let draft = self.extract_and_classify(url, type_hint).await?;
        let record = store.save(draft).await?;
        telemetry::record_saved(record.source.as_str());
        debug!(id = %record.id, backend = store.backend(), "Reference stored");
        Ok(record)
    }

    /// Classifies free text without fetching anything.
    pub fn classify_text(&self, text: &str) -> TextProfile {
        Refinery::new(&self.model).profile(
            &Evidence {
                full_text: Some(text),
                ..Default::default()
            },
            None,
        )
    }

    /// Closes the render pool, if this orchestrator owns one.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
    }

    // * Best effort: a linked PDF supplies full text the page lacked
    async fn attach_pdf_text(&self, mut raw: RawExtraction) -> RawExtraction {
        if raw.full_text.is_some() {
            return raw;
        }
        let Some(link) = raw.pdf_link.clone() else {
            return raw;
        };

        match tokio::time::timeout(self.static_timeout, self.pdf.fetch_text(&link)).await {
            Ok(Ok(text)) => {
                debug!(pdf = %link, chars = text.len(), "Attached linked PDF text");
                raw.full_text = Some(text);
            }
            Ok(Err(e)) => warn!(pdf = %link, error = %e, "Linked PDF unavailable"),
            Err(_) => warn!(pdf = %link, "Linked PDF download timed out"),
        }
        raw
    }

    fn assemble(&self, url: &str, raw: RawExtraction, type_hint: Option<DocumentType>) -> ReferenceDraft {
        let profile = Refinery::new(&self.model).profile(
            &Evidence {
                url: Some(url),
                title: Some(raw.title.as_str()),
                abstract_text: raw.abstract_text.as_deref(),
                full_text: raw.full_text.as_deref(),
            },
            type_hint,
        );

        ReferenceDraft::builder(raw.title)
            .authors(raw.authors)
            .abstract_text(raw.abstract_text)
            .full_text(raw.full_text)
            .url(url)
            .document_type(profile.document_type)
            .discipline(profile.discipline)
            .keywords(profile.keywords)
            .publication_year(raw.publication_year)
            .doi(raw.doi)
            .journal(raw.journal)
            .source(ReferenceSource::UrlExtraction)
            .extraction_metadata(ExtractionMetadata {
                source_url: Some(url.to_string()),
                extracted_at: Utc::now(),
                extraction_method: raw.extraction_method,
                confidence: profile.confidence,
            })
            .build()
    }
}
