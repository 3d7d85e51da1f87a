// * Reference record schema
// * A ReferenceDraft is everything the pipeline knows about a work; the store
// * turns it into a ReferenceRecord by assigning identity and timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::constants::DEFAULT_DISCIPLINE;
use crate::refinery::doc_type::DocumentType;
use crate::refinery::metadata::plausible_year;

// * Rating bounds (inclusive)
pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Rating {0} outside 1..=5")]
    InvalidRating(u8),

    #[error("Title must not be blank")]
    BlankTitle,

    #[error("Publication year {0} is not plausible")]
    ImplausibleYear(i32),
}

pub fn validate_rating(rating: u8) -> Result<u8, SchemaError> {
    if (RATING_MIN..=RATING_MAX).contains(&rating) {
        Ok(rating)
    } else {
        Err(SchemaError::InvalidRating(rating))
    }
}

/// How a reference entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    #[default]
    Manual,
    UrlExtraction,
    PdfUpload,
    DoiLookup,
}

impl ReferenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::UrlExtraction => "url_extraction",
            Self::PdfUpload => "pdf_upload",
            Self::DoiLookup => "doi_lookup",
        }
    }
}

/// Provenance of an automatically extracted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub source_url: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub extraction_method: String,
    /// Discipline classifier confidence in [0, 1].
    pub confidence: f64,
}

/// A reference that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDraft {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub full_text: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub discipline: String,
    pub keywords: Vec<String>,
    pub publication_year: Option<i32>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub pdf_path: Option<String>,
    pub rating: Option<u8>,
    pub bookmarked: bool,
    pub tags: Vec<String>,
    pub source: ReferenceSource,
    pub extraction_metadata: Option<ExtractionMetadata>,
}

impl ReferenceDraft {
    pub fn builder(title: impl Into<String>) -> ReferenceDraftBuilder {
        ReferenceDraftBuilder::new(title)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.title.trim().is_empty() {
            return Err(SchemaError::BlankTitle);
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        if let Some(year) = self.publication_year {
            plausible_year(year).ok_or(SchemaError::ImplausibleYear(year))?;
        }
        Ok(())
    }
}

/// Builder pattern for ReferenceDraft construction
#[derive(Debug, Clone)]
pub struct ReferenceDraftBuilder {
    draft: ReferenceDraft,
}

impl ReferenceDraftBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            draft: ReferenceDraft {
                title: title.into(),
                authors: Vec::new(),
                abstract_text: None,
                full_text: None,
                url: None,
                document_type: DocumentType::default(),
                discipline: DEFAULT_DISCIPLINE.to_string(),
                keywords: Vec::new(),
                publication_year: None,
                journal: None,
                doi: None,
                pdf_path: None,
                rating: None,
                bookmarked: false,
                tags: Vec::new(),
                source: ReferenceSource::default(),
                extraction_metadata: None,
            },
        }
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.draft.authors = authors;
        self
    }

    pub fn abstract_text(mut self, text: Option<String>) -> Self {
        self.draft.abstract_text = text;
        self
    }

    pub fn full_text(mut self, text: Option<String>) -> Self {
        self.draft.full_text = text;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.draft.url = Some(url.into());
        self
    }

    pub fn document_type(mut self, document_type: DocumentType) -> Self {
        self.draft.document_type = document_type;
        self
    }

    pub fn discipline(mut self, discipline: impl Into<String>) -> Self {
        self.draft.discipline = discipline.into();
        self
    }

    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        self.draft.keywords = keywords;
        self
    }

    pub fn publication_year(mut self, year: Option<i32>) -> Self {
        // * Silent validation - implausible years are dropped
        self.draft.publication_year = year.and_then(plausible_year);
        self
    }

    pub fn journal(mut self, journal: Option<String>) -> Self {
        self.draft.journal = journal;
        self
    }

    pub fn doi(mut self, doi: Option<String>) -> Self {
        self.draft.doi = doi;
        self
    }

    pub fn pdf_path(mut self, path: impl Into<String>) -> Self {
        self.draft.pdf_path = Some(path.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.draft.tags = tags;
        self
    }

    pub fn source(mut self, source: ReferenceSource) -> Self {
        self.draft.source = source;
        self
    }

    pub fn extraction_metadata(mut self, metadata: ExtractionMetadata) -> Self {
        self.draft.extraction_metadata = Some(metadata);
        self
    }

    pub fn build(self) -> ReferenceDraft {
        self.draft
    }
}

/// A stored reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub full_text: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub discipline: String,
    pub keywords: Vec<String>,
    pub publication_year: Option<i32>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub pdf_path: Option<String>,
    pub rating: Option<u8>,
    pub bookmarked: bool,
    pub tags: Vec<String>,
    pub source: ReferenceSource,
    pub extraction_metadata: Option<ExtractionMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceRecord {
    /// Assigns a fresh UUID v4 and sets both timestamps to `now`.
    pub fn from_draft(draft: ReferenceDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            authors: draft.authors,
            abstract_text: draft.abstract_text,
            full_text: draft.full_text,
            url: draft.url,
            document_type: draft.document_type,
            discipline: draft.discipline,
            keywords: draft.keywords,
            publication_year: draft.publication_year,
            journal: draft.journal,
            doi: draft.doi,
            pdf_path: draft.pdf_path,
            rating: draft.rating,
            bookmarked: draft.bookmarked,
            tags: draft.tags,
            source: draft.source,
            extraction_metadata: draft.extraction_metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Converts to JSON string for serialization
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencePatch {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub full_text: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
    pub discipline: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub publication_year: Option<i32>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub rating: Option<u8>,
    pub bookmarked: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl ReferencePatch {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(SchemaError::BlankTitle);
            }
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        if let Some(year) = self.publication_year {
            plausible_year(year).ok_or(SchemaError::ImplausibleYear(year))?;
        }
        Ok(())
    }

    /// Applies the patch and bumps `updated_at`, never below `created_at`.
    pub fn apply(self, record: &mut ReferenceRecord, now: DateTime<Utc>) {
        if let Some(v) = self.title {
            record.title = v;
        }
        if let Some(v) = self.authors {
            record.authors = v;
        }
        if let Some(v) = self.abstract_text {
            record.abstract_text = Some(v);
        }
        if let Some(v) = self.full_text {
            record.full_text = Some(v);
        }
        if let Some(v) = self.url {
            record.url = Some(v);
        }
        if let Some(v) = self.document_type {
            record.document_type = v;
        }
        if let Some(v) = self.discipline {
            record.discipline = v;
        }
        if let Some(v) = self.keywords {
            record.keywords = v;
        }
        if let Some(v) = self.publication_year {
            record.publication_year = Some(v);
        }
        if let Some(v) = self.journal {
            record.journal = Some(v);
        }
        if let Some(v) = self.doi {
            record.doi = Some(v);
        }
        if let Some(v) = self.rating {
            record.rating = Some(v);
        }
        if let Some(v) = self.bookmarked {
            record.bookmarked = v;
        }
        if let Some(v) = self.tags {
            record.tags = v;
        }
        record.updated_at = now.max(record.created_at);
    }
}
