// * Reference store contract
// * Backends implement the primitive operations; bookmark, rating and overview
// * are provided on top of them. Filtering and sorting live here so every
// * backend answers queries identically.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

use crate::persistence::schema::{
    validate_rating, ReferenceDraft, ReferencePatch, ReferenceRecord, SchemaError,
};
use crate::refinery::doc_type::DocumentType;

// * Records listed in the overview
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<SchemaError> for StoreError {
    fn from(e: SchemaError) -> Self {
        StoreError::InvalidInput(e.to_string())
    }
}

pub type StoreResult<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Record selection. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
    pub discipline: Option<String>,
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ReferenceRecord) -> bool {
        if let Some(document_type) = self.document_type {
            if record.document_type != document_type {
                return false;
            }
        }
        if let Some(discipline) = &self.discipline {
            if &record.discipline != discipline {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => search_matches(record, &term.to_lowercase()),
            _ => true,
        }
    }
}

// * Case-insensitive substring over title, abstract, full text, authors and keywords
fn search_matches(record: &ReferenceRecord, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);

    hit(&record.title)
        || record.abstract_text.as_deref().is_some_and(hit)
        || record.full_text.as_deref().is_some_and(hit)
        || record.authors.iter().any(|a| hit(a))
        || record.keywords.iter().any(|k| hit(k))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    PublicationYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub sort: SortField,
    pub order: SortOrder,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn newest(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    fn compare(&self, a: &ReferenceRecord, b: &ReferenceRecord) -> Ordering {
        let primary = match self.sort {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::PublicationYear => a.publication_year.cmp(&b.publication_year),
        };
        let ordered = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        // * Stable output across backends with unordered storage
        ordered.then_with(|| a.id.cmp(&b.id))
    }
}

/// Filters, sorts and pages a set of records.
pub fn select<I>(records: I, filter: &RecordFilter, options: &QueryOptions) -> Vec<ReferenceRecord>
where
    I: IntoIterator<Item = ReferenceRecord>,
{
    let mut hits: Vec<ReferenceRecord> = records.into_iter().filter(|r| filter.matches(r)).collect();
    hits.sort_by(|a, b| options.compare(a, b));

    let page = hits.into_iter().skip(options.skip);
    match options.limit {
        Some(limit) => page.take(limit).collect(),
        None => page.collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateField {
    DocumentType,
    Discipline,
}

impl AggregateField {
    fn value_of(&self, record: &ReferenceRecord) -> String {
        match self {
            Self::DocumentType => record.document_type.as_str().to_string(),
            Self::Discipline => record.discipline.clone(),
        }
    }
}

impl FromStr for AggregateField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" | "document_type" => Ok(Self::DocumentType),
            "discipline" => Ok(Self::Discipline),
            other => Err(StoreError::InvalidInput(format!(
                "Cannot aggregate by '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCount {
    pub value: String,
    pub count: usize,
}

/// Counts records per field value, most frequent first, ties by value.
pub fn tally<'r, I>(records: I, field: AggregateField) -> Vec<FieldCount>
where
    I: IntoIterator<Item = &'r ReferenceRecord>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        *counts.entry(field.value_of(record)).or_insert(0) += 1;
    }

    let mut result: Vec<FieldCount> = counts
        .into_iter()
        .map(|(value, count)| FieldCount { value, count })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    result
}

/// Library statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total: usize,
    pub type_stats: Vec<FieldCount>,
    pub discipline_stats: Vec<FieldCount>,
    pub recent: Vec<ReferenceRecord>,
}

/// Persistence contract for reference records.
pub trait ReferenceStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Assigns id and timestamps, then stores the record.
    fn save(&self, draft: ReferenceDraft) -> StoreResult<'_, ReferenceRecord>;

    fn find_by_id<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>>;

    fn find(&self, filter: RecordFilter, options: QueryOptions) -> StoreResult<'_, Vec<ReferenceRecord>>;

    /// `None` when no record has the id.
    fn update<'a>(&'a self, id: &'a str, patch: ReferencePatch) -> StoreResult<'a, Option<ReferenceRecord>>;

    /// Returns the removed record.
    fn delete<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>>;

    fn count(&self, filter: RecordFilter) -> StoreResult<'_, usize>;

    fn aggregate_by_field(&self, field: AggregateField) -> StoreResult<'_, Vec<FieldCount>>;

    /// Flips the bookmark flag in one atomic step; concurrent toggles never
    /// overwrite each other.
    fn toggle_bookmark<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>>;

    fn rate<'a>(&'a self, id: &'a str, rating: u8) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(async move {
            let rating = validate_rating(rating)?;
            let patch = ReferencePatch {
                rating: Some(rating),
                ..Default::default()
            };
            self.update(id, patch).await
        })
    }

    fn overview(&self) -> StoreResult<'_, Overview> {
        Box::pin(async move {
            Ok(Overview {
                total: self.count(RecordFilter::default()).await?,
                type_stats: self.aggregate_by_field(AggregateField::DocumentType).await?,
                discipline_stats: self.aggregate_by_field(AggregateField::Discipline).await?,
                recent: self
                    .find(RecordFilter::default(), QueryOptions::newest(RECENT_LIMIT))
                    .await?,
            })
        })
    }
}

/// Validates a draft and turns it into a record stamped with the current time.
pub fn stamp(draft: ReferenceDraft) -> Result<ReferenceRecord, StoreError> {
    draft.validate()?;
    Ok(ReferenceRecord::from_draft(draft, Utc::now()))
}

/// Patch flipping the record's current bookmark flag.
pub fn bookmark_toggle(record: &ReferenceRecord) -> ReferencePatch {
    ReferencePatch {
        bookmarked: Some(!record.bookmarked),
        ..Default::default()
    }
}

/// Validates and applies a patch in place.
pub fn patch_record(record: &mut ReferenceRecord, patch: ReferencePatch) -> Result<(), StoreError> {
    patch.validate()?;
    patch.apply(record, Utc::now());
    Ok(())
}
