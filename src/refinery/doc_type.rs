// * Rule-based document type detection
// * Cascade, first match wins: URL evidence, then thesis, book, report, paper markers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of reference types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Journal,
    Thesis,
    Book,
    Report,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [Self::Journal, Self::Thesis, Self::Book, Self::Report];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Thesis => "thesis",
            Self::Book => "book",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "journal" => Ok(Self::Journal),
            "thesis" => Ok(Self::Thesis),
            "book" => Ok(Self::Book),
            "report" => Ok(Self::Report),
            other => Err(format!("unknown document type '{}'", other)),
        }
    }
}

// * Rule 1: URL markers of journals, preprint servers and conferences
pub const JOURNAL_URL_MARKERS: &[&str] = &[
    "journal", "ijcai", "nips", "icml", "iclr", "arxiv.org", "scholar.google", "researchgate",
    "ieee.org",
];

// * Rule 2: URL markers of thesis repositories
pub const THESIS_URL_MARKERS: &[&str] = &["thesis", "dissertation", "etd", "repository"];

// * Rule 3
pub const THESIS_TITLE_MARKERS: &[&str] = &["thesis", "dissertation", "master", "phd", "doctoral"];
pub const THESIS_TEXT_MARKERS: &[&str] = &["thesis", "dissertation", "supervisor", "committee"];

// * Rule 4
pub const BOOK_TITLE_MARKERS: &[&str] = &["handbook", "introduction to", "guide to", "textbook"];
pub const BOOK_TEXT_MARKERS: &[&str] = &["chapter", "isbn", "publisher", "edition"];

// * Rule 5
pub const REPORT_TITLE_MARKERS: &[&str] = &["report", "technical report", "white paper", "survey"];
pub const REPORT_TEXT_MARKERS: &[&str] = &["report", "findings", "recommendations"];

// * Rule 6
pub const PAPER_TEXT_MARKERS: &[&str] = &[
    "abstract", "keywords", "introduction", "methodology", "results", "conclusion", "references",
    "doi", "published", "journal",
];

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| haystack.contains(m))
}

/// Infers the document type from whatever evidence is available.
pub fn detect_type(
    url: Option<&str>,
    title: Option<&str>,
    abstract_text: Option<&str>,
    full_text: Option<&str>,
) -> DocumentType {
    if let Some(url) = url {
        let url = url.to_lowercase();
        if contains_any(&url, JOURNAL_URL_MARKERS) {
            return DocumentType::Journal;
        }
        if contains_any(&url, THESIS_URL_MARKERS) {
            return DocumentType::Thesis;
        }
    }

    let title = title.unwrap_or("").to_lowercase();
    let text = format!(
        "{} {} {}",
        title,
        abstract_text.unwrap_or(""),
        full_text.unwrap_or("")
    )
    .to_lowercase();

    if contains_any(&title, THESIS_TITLE_MARKERS) || contains_any(&text, THESIS_TEXT_MARKERS) {
        return DocumentType::Thesis;
    }
    if contains_any(&title, BOOK_TITLE_MARKERS) || contains_any(&text, BOOK_TEXT_MARKERS) {
        return DocumentType::Book;
    }
    if contains_any(&title, REPORT_TITLE_MARKERS) || contains_any(&text, REPORT_TEXT_MARKERS) {
        return DocumentType::Report;
    }
    if contains_any(&text, PAPER_TEXT_MARKERS) {
        return DocumentType::Journal;
    }

    DocumentType::Journal
}
