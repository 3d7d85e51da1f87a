// * Scholarly metadata extraction from static HTML
// * Extraction chain: Highwire citation_* tags -> JSON-LD -> Dublin Core -> Open Graph/meta

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::constants::{MAX_PUBLICATION_YEAR, MIN_PUBLICATION_YEAR};
use crate::refinery::text::collapse_whitespace;

static SELECTOR_JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static SELECTOR_META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());

// * First four-digit run, as scholarly pages print "Submitted 12 Mar 2021" or "(2019)"
static YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})").unwrap());

/// Bibliographic metadata declared by the page itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScholarlyMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub publication_year: Option<i32>,
    pub pdf_url: Option<String>,
    pub doi: Option<String>,
    pub journal: Option<String>,
    pub publisher: Option<String>,
    pub keywords: Vec<String>,
    pub extraction_method: String,
}

impl ScholarlyMetadata {
    pub fn has_citation_data(&self) -> bool {
        self.title.is_some() && !self.authors.is_empty()
    }
}

/// Returns the year if it lies in the accepted publication range.
pub fn plausible_year(year: i32) -> Option<i32> {
    (MIN_PUBLICATION_YEAR..=MAX_PUBLICATION_YEAR)
        .contains(&year)
        .then_some(year)
}

/// Pulls the first four-digit number out of free text and range-checks it.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .and_then(plausible_year)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonLdType {
    Single(String),
    Array(Vec<String>),
}

impl JsonLdType {
    fn is_scholarly(&self) -> bool {
        let matches = |t: &str| {
            t.contains("ScholarlyArticle")
                || t.contains("Article")
                || t.contains("Thesis")
                || t.contains("Book")
                || t.contains("Report")
        };
        match self {
            Self::Single(t) => matches(t),
            Self::Array(types) => types.iter().any(|t| matches(t)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct JsonLdWork {
    #[serde(rename = "@type")]
    schema_type: Option<JsonLdType>,
    #[serde(alias = "headline")]
    name: Option<String>,
    description: Option<String>,
    #[serde(alias = "abstract")]
    abstract_text: Option<String>,
    #[serde(alias = "datePublished")]
    date_published: Option<String>,
    author: Option<JsonLdAuthor>,
    publisher: Option<JsonLdNamed>,
    #[serde(alias = "isPartOf")]
    is_part_of: Option<JsonLdNamed>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonLdAuthor {
    Single(JsonLdNamed),
    Multiple(Vec<JsonLdNamed>),
    Name(String),
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct JsonLdNamed {
    name: Option<String>,
}

/// Extracts bibliographic metadata using a prioritized chain.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Parses the HTML and runs the full chain.
    pub fn extract(html: &str) -> ScholarlyMetadata {
        let document = Html::parse_document(html);
        Self::extract_document(&document)
    }

    /// Runs the chain on an already parsed document.
    pub fn extract_document(document: &Html) -> ScholarlyMetadata {
        let mut metadata = ScholarlyMetadata::default();

        // * Step 1: Highwire Press tags (what Google Scholar indexes)
        if Self::extract_citation_tags(document, &mut metadata) {
            metadata.extraction_method = "citation_meta".to_string();
        }

        // * Step 2: JSON-LD fills gaps
        if Self::extract_json_ld(document, &mut metadata) && metadata.extraction_method.is_empty() {
            metadata.extraction_method = "json_ld".to_string();
        }

        // * Step 3: Dublin Core, Open Graph and plain meta tags
        Self::extract_generic_meta(document, &mut metadata);

        if metadata.extraction_method.is_empty() {
            metadata.extraction_method = "meta_tags".to_string();
        }

        metadata
    }

    fn extract_citation_tags(document: &Html, metadata: &mut ScholarlyMetadata) -> bool {
        let mut found = false;

        for meta in document.select(&SELECTOR_META) {
            let name = meta.value().attr("name").unwrap_or("").to_lowercase();
            let content = collapse_whitespace(meta.value().attr("content").unwrap_or(""));
            if content.is_empty() || !name.starts_with("citation_") {
                continue;
            }
            found = true;

            match name.as_str() {
                "citation_title" => {
                    metadata.title.get_or_insert(content);
                }
                "citation_author" => {
                    if !metadata.authors.contains(&content) {
                        metadata.authors.push(content);
                    }
                }
                "citation_publication_date" | "citation_date" | "citation_online_date"
                | "citation_year" => {
                    if metadata.publication_year.is_none() {
                        metadata.publication_year = extract_year(&content);
                    }
                }
                "citation_pdf_url" => {
                    metadata.pdf_url.get_or_insert(content);
                }
                "citation_doi" => {
                    metadata.doi.get_or_insert(content);
                }
                "citation_journal_title" | "citation_conference_title" => {
                    metadata.journal.get_or_insert(content);
                }
                "citation_publisher" | "citation_dissertation_institution" => {
                    metadata.publisher.get_or_insert(content);
                }
                "citation_abstract" => {
                    metadata.description.get_or_insert(content);
                }
                "citation_keywords" => {
                    metadata.keywords.extend(
                        content
                            .split([',', ';'])
                            .map(|k| k.trim().to_string())
                            .filter(|k| !k.is_empty()),
                    );
                }
                _ => {}
            }
        }

        found
    }

    fn extract_json_ld(document: &Html, metadata: &mut ScholarlyMetadata) -> bool {
        let mut found = false;

        for script in document.select(&SELECTOR_JSON_LD) {
            let json_text = script.text().collect::<String>();
            let Ok(work) = serde_json::from_str::<JsonLdWork>(&json_text) else {
                continue;
            };

            let scholarly = work.schema_type.as_ref().is_some_and(JsonLdType::is_scholarly);
            if !scholarly {
                continue;
            }
            found = true;

            if metadata.title.is_none() {
                metadata.title = work.name.map(|n| collapse_whitespace(&n));
            }
            if metadata.description.is_none() {
                metadata.description = work.abstract_text.or(work.description);
            }
            if metadata.publication_year.is_none() {
                metadata.publication_year = work.date_published.as_deref().and_then(extract_year);
            }
            if metadata.authors.is_empty() {
                match work.author {
                    Some(JsonLdAuthor::Single(person)) => {
                        metadata.authors.extend(person.name);
                    }
                    Some(JsonLdAuthor::Multiple(people)) => {
                        metadata.authors.extend(people.into_iter().filter_map(|p| p.name));
                    }
                    Some(JsonLdAuthor::Name(name)) => metadata.authors.push(name),
                    None => {}
                }
            }
            if metadata.publisher.is_none() {
                metadata.publisher = work.publisher.and_then(|p| p.name);
            }
            if metadata.journal.is_none() {
                metadata.journal = work.is_part_of.and_then(|p| p.name);
            }
        }

        found
    }

    fn extract_generic_meta(document: &Html, metadata: &mut ScholarlyMetadata) {
        for meta in document.select(&SELECTOR_META) {
            let key = meta
                .value()
                .attr("name")
                .or_else(|| meta.value().attr("property"))
                .unwrap_or("")
                .to_lowercase();
            let content = collapse_whitespace(meta.value().attr("content").unwrap_or(""));
            if content.is_empty() {
                continue;
            }

            match key.as_str() {
                "dc.title" | "og:title" => {
                    metadata.title.get_or_insert(content);
                }
                "dc.creator" | "author" => {
                    if !metadata.authors.contains(&content) {
                        metadata.authors.push(content);
                    }
                }
                "dc.date" | "dc.date.issued" | "article:published_time" => {
                    if metadata.publication_year.is_none() {
                        metadata.publication_year = extract_year(&content);
                    }
                }
                "dc.identifier" if content.starts_with("10.") || content.contains("doi.org/") => {
                    metadata.doi.get_or_insert(content);
                }
                "description" | "og:description" | "dc.description" => {
                    metadata.description.get_or_insert(content);
                }
                "keywords" if metadata.keywords.is_empty() => {
                    metadata.keywords.extend(
                        content
                            .split(',')
                            .map(|k| k.trim().to_string())
                            .filter(|k| !k.is_empty()),
                    );
                }
                _ => {}
            }
        }
    }
}
