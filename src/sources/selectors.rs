// * Per-site selector profiles and the parser that applies them
// * Selectors track the sites' current markup; they are configuration, not contracts.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::refinery::content::first_text;
use crate::refinery::metadata::{extract_year, MetadataExtractor};
use crate::sources::{RawExtraction, SourceError};

/// How author elements turn into author names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorMode {
    /// Every matching element is one author.
    Each,
    /// Text of the first match up to the separator, kept as a single author string.
    LeadingSegment(char),
}

/// CSS selectors describing where a site keeps each bibliographic field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorProfile {
    pub name: String,
    /// Tried in order; first non-empty match wins.
    pub title: Vec<String>,
    pub authors: String,
    pub author_mode: AuthorMode,
    pub abstract_text: String,
    /// Element whose text contains the publication year.
    pub year: String,
    pub pdf_link: Option<String>,
    /// Field labels some sites print inside the element, e.g. "Title:".
    pub title_label: Option<String>,
    pub abstract_label: Option<String>,
}

impl SelectorProfile {
    pub fn google_scholar() -> Self {
        Self {
            name: "google_scholar".to_string(),
            title: strings(&["h3 a", ".gs_rt a", "h3", ".gs_rt"]),
            authors: ".gs_a".to_string(),
            author_mode: AuthorMode::LeadingSegment('-'),
            abstract_text: ".gs_rs".to_string(),
            year: ".gs_a".to_string(),
            pdf_link: Some(r#"a[href*=".pdf"]"#.to_string()),
            title_label: None,
            abstract_label: None,
        }
    }

    pub fn researchgate() -> Self {
        Self {
            name: "researchgate".to_string(),
            title: strings(&["h1"]),
            authors: r#"[data-testid="author-name"]"#.to_string(),
            author_mode: AuthorMode::Each,
            abstract_text: r#"[data-testid="publication-abstract"]"#.to_string(),
            year: ".publication-meta".to_string(),
            pdf_link: None,
            title_label: None,
            abstract_label: None,
        }
    }

    pub fn ieee() -> Self {
        Self {
            name: "ieee".to_string(),
            title: strings(&[".document-title span", ".document-title"]),
            authors: ".authors-info .author".to_string(),
            author_mode: AuthorMode::Each,
            abstract_text: ".abstract-text".to_string(),
            year: ".publication-date".to_string(),
            pdf_link: None,
            title_label: None,
            abstract_label: None,
        }
    }

    pub fn arxiv() -> Self {
        Self {
            name: "arxiv".to_string(),
            title: strings(&[".title"]),
            authors: ".authors a".to_string(),
            author_mode: AuthorMode::Each,
            abstract_text: ".abstract".to_string(),
            year: ".submission-history".to_string(),
            pdf_link: Some(".download-pdf".to_string()),
            title_label: Some("Title:".to_string()),
            abstract_label: Some("Abstract:".to_string()),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn compile(selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector)
        .map_err(|_| SourceError::Parse(format!("invalid selector '{}'", selector)))
}

fn strip_label(text: String, label: Option<&str>) -> String {
    match label {
        Some(label) => text
            .strip_prefix(label)
            .map(|rest| rest.trim().to_string())
            .unwrap_or(text),
        None => text,
    }
}

/// Applies a profile to HTML. Fields the profile misses fall back to the
/// page's citation/JSON-LD metadata; a missing title leaves it empty.
pub fn parse_with_profile(
    html: &str,
    base_url: &str,
    profile: &SelectorProfile,
) -> Result<RawExtraction, SourceError> {
    let document = Html::parse_document(html);
    let metadata = MetadataExtractor::extract_document(&document);

    let mut title = None;
    for selector in &profile.title {
        if let Some(text) = first_text(&document, &compile(selector)?) {
            title = Some(strip_label(text, profile.title_label.as_deref()));
            break;
        }
    }

    let authors_selector = compile(&profile.authors)?;
    let mut authors: Vec<String> = match profile.author_mode {
        AuthorMode::Each => document
            .select(&authors_selector)
            .map(crate::refinery::content::visible_text)
            .filter(|name| !name.is_empty())
            .collect(),
        AuthorMode::LeadingSegment(separator) => first_text(&document, &authors_selector)
            .and_then(|text| text.split(separator).next().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .into_iter()
            .collect(),
    };
    if authors.is_empty() {
        authors = metadata.authors.clone();
    }

    let abstract_text = first_text(&document, &compile(&profile.abstract_text)?)
        .map(|text| strip_label(text, profile.abstract_label.as_deref()))
        .filter(|text| !text.is_empty())
        .or_else(|| metadata.description.clone());

    let year = first_text(&document, &compile(&profile.year)?)
        .and_then(|text| extract_year(&text))
        .or(metadata.publication_year);

    let mut pdf_link = None;
    if let Some(selector) = &profile.pdf_link {
        pdf_link = document
            .select(&compile(selector)?)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| resolve(base_url, href));
    }
    let pdf_link = pdf_link.or_else(|| {
        metadata
            .pdf_url
            .as_deref()
            .and_then(|href| resolve(base_url, href))
    });

    let extraction = RawExtraction {
        title: title.or(metadata.title).unwrap_or_default(),
        authors,
        abstract_text,
        full_text: None,
        pdf_link,
        publication_year: None,
        doi: metadata.doi,
        journal: metadata.journal,
        extraction_method: profile.name.clone(),
    };
    Ok(extraction.with_year(year))
}

/// Resolves a possibly relative link against the page URL.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(base_url) {
        Ok(base) => base.join(href).ok().map(String::from),
        Err(_) => Url::parse(href).ok().map(String::from),
    }
}
