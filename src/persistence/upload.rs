// * PDF upload ingestion
// * Validate, persist the file, extract text, classify, save. The stored file
// * never outlives a failed ingestion.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::constants::{MAX_PDF_BYTES, PDF_PARSE_TIMEOUT_SECS};
use crate::config::settings::PipelineSettings;
use crate::ops::telemetry;
use crate::persistence::schema::{ExtractionMetadata, ReferenceDraft, ReferenceRecord, ReferenceSource};
use crate::persistence::store::{ReferenceStore, StoreError};
use crate::refinery::{DisciplineModel, DocumentType, Evidence, Refinery};
use crate::sources::pdf::{first_line, pdf_to_text};
use crate::sources::SourceError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    #[error("Failed to write upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read PDF: {0}")]
    Parse(#[from] SourceError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// An uploaded PDF plus optional caller-supplied metadata.
#[derive(Debug, Clone, Default)]
pub struct PdfUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    /// Comma-separated author names.
    pub authors: Option<String>,
    pub document_type: Option<DocumentType>,
    pub discipline: Option<String>,
}

impl PdfUpload {
    fn validate(&self, max_bytes: usize) -> Result<(), UploadError> {
        let content_type = self.content_type.split(';').next().unwrap_or("").trim();
        if !content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
            return Err(UploadError::InvalidInput(format!(
                "only PDF files are allowed, got '{}'",
                self.content_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(UploadError::InvalidInput("file is empty".to_string()));
        }
        if self.bytes.len() > max_bytes {
            return Err(UploadError::InvalidInput(format!(
                "file too large, maximum size is {} bytes",
                max_bytes
            )));
        }
        Ok(())
    }

    fn file_stem(&self) -> Option<String> {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

// * Non-blank trimmed values from a comma-separated list
fn split_authors(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

pub struct PdfUploader {
    upload_dir: PathBuf,
    max_bytes: usize,
    parse_timeout: Duration,
    model: Arc<DisciplineModel>,
}

impl PdfUploader {
    pub fn new(upload_dir: impl Into<PathBuf>, model: Arc<DisciplineModel>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_bytes: MAX_PDF_BYTES,
            parse_timeout: Duration::from_secs(PDF_PARSE_TIMEOUT_SECS),
            model,
        }
    }

    pub fn from_settings(settings: &PipelineSettings, model: Arc<DisciplineModel>) -> Self {
        Self::new(settings.upload_dir.clone(), model).with_max_bytes(settings.max_pdf_bytes)
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Stores the upload and saves a reference built from its text.
    pub async fn ingest(
        &self,
        upload: PdfUpload,
        store: &dyn ReferenceStore,
    ) -> Result<ReferenceRecord, UploadError> {
        upload.validate(self.max_bytes)?;

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(format!("{}.pdf", Uuid::new_v4()));
        tokio::fs::write(&path, &upload.bytes).await?;

        match self.ingest_stored(&upload, &path, store).await {
            Ok(record) => {
                info!(id = %record.id, file = %upload.file_name, "PDF upload ingested");
                telemetry::record_saved(ReferenceSource::PdfUpload.as_str());
                Ok(record)
            }
            Err(e) => {
                warn!(file = %upload.file_name, error = %e, "PDF upload failed, removing stored file");
                if let Err(io) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %io, "Could not remove failed upload");
                }
                Err(e)
            }
        }
    }

    async fn ingest_stored(
        &self,
        upload: &PdfUpload,
        path: &Path,
        store: &dyn ReferenceStore,
    ) -> Result<ReferenceRecord, UploadError> {
        let text = pdf_to_text(upload.bytes.clone(), self.parse_timeout).await?;
        let draft = self.draft(upload, text, path);
        Ok(store.save(draft).await?)
    }

    fn draft(&self, upload: &PdfUpload, text: String, path: &Path) -> ReferenceDraft {
        let title = non_blank(upload.title.as_ref())
            .map(str::to_string)
            .or_else(|| first_line(&text).map(str::to_string))
            .or_else(|| upload.file_stem())
            .unwrap_or_else(|| upload.file_name.clone());

        let refinery = Refinery::new(&self.model);
        let profile = refinery.profile(
            &Evidence {
                title: Some(title.as_str()),
                full_text: Some(text.as_str()),
                ..Default::default()
            },
            Some(upload.document_type.unwrap_or(DocumentType::Journal)),
        );

        let (discipline, confidence) = match non_blank(upload.discipline.as_ref()) {
            Some(provided) => (provided.to_string(), 1.0),
            None => (profile.discipline, profile.confidence),
        };

        ReferenceDraft::builder(title)
            .authors(upload.authors.as_deref().map(split_authors).unwrap_or_default())
            .full_text(Some(text))
            .document_type(profile.document_type)
            .discipline(discipline)
            .keywords(profile.keywords)
            .pdf_path(path.to_string_lossy())
            .source(ReferenceSource::PdfUpload)
            .extraction_metadata(ExtractionMetadata {
                source_url: None,
                extracted_at: Utc::now(),
                extraction_method: "pdf_upload".to_string(),
                confidence,
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, bytes: &[u8]) -> PdfUpload {
        PdfUpload {
            file_name: "paper.pdf".to_string(),
            content_type: content_type.to_string(),
            bytes: bytes.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_content_type_check() {
        assert!(upload("application/pdf", b"%PDF").validate(10).is_ok());
        assert!(upload("Application/PDF; charset=binary", b"%PDF").validate(10).is_ok());
        assert!(matches!(
            upload("text/html", b"%PDF").validate(10),
            Err(UploadError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_size_limit() {
        assert!(matches!(
            upload("application/pdf", &[b'x'; 11]).validate(10),
            Err(UploadError::InvalidInput(_))
        ));
        assert!(matches!(
            upload("application/pdf", b"").validate(10),
            Err(UploadError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_split_authors() {
        assert_eq!(split_authors("Ada Lovelace, , Alan Turing "), vec!["Ada Lovelace", "Alan Turing"]);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(upload("application/pdf", b"").file_stem().as_deref(), Some("paper"));
    }

    #[test]
    fn test_draft_title_order() {
        let model = Arc::new(DisciplineModel::with_default_corpus().unwrap());
        let uploader = PdfUploader::new("uploads", model);
        let path = Path::new("uploads/x.pdf");

        let mut pdf = upload("application/pdf", b"%PDF");
        pdf.title = Some("Given".to_string());
        assert_eq!(uploader.draft(&pdf, "First line\nbody".to_string(), path).title, "Given");

        pdf.title = None;
        assert_eq!(uploader.draft(&pdf, "First line\nbody".to_string(), path).title, "First line");

        let draft = uploader.draft(&pdf, "  \n ".to_string(), path);
        assert_eq!(draft.title, "paper");
        assert_eq!(draft.document_type, DocumentType::Journal);
        assert_eq!(draft.source, ReferenceSource::PdfUpload);
        assert_eq!(draft.pdf_path.as_deref(), Some("uploads/x.pdf"));
    }
}
