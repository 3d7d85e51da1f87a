// * The Refinery: text analysis for scholarly references
// * Keyword extraction, discipline classification, document typing and
// * metadata recovery from HTML. Everything here is synchronous and pure.

pub mod content;
pub mod discipline;
pub mod doc_type;
pub mod keywords;
pub mod metadata;
pub mod text;

// * Re-exports for convenient access
pub use discipline::{train_classifier, Classification, DisciplineModel, TrainingDocument, TrainingError};
pub use doc_type::{detect_type, DocumentType};
pub use keywords::extract_keywords;
pub use metadata::{extract_year, MetadataExtractor, ScholarlyMetadata};
pub use text::normalize;

use serde::{Deserialize, Serialize};

/// Classification outcome for a single piece of text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextProfile {
    pub discipline: String,
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub document_type: DocumentType,
}

/// Evidence the refinery classifies. Any field may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evidence<'a> {
    pub url: Option<&'a str>,
    pub title: Option<&'a str>,
    pub abstract_text: Option<&'a str>,
    pub full_text: Option<&'a str>,
}

impl<'a> Evidence<'a> {
    /// Text fed to the classifier and keyword extractor:
    /// the first non-blank of full text, abstract, title.
    pub fn classification_text(&self) -> &'a str {
        [self.full_text, self.abstract_text, self.title]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty())
            .unwrap_or("")
    }
}

/// Runs keyword extraction, classification and type detection over one set of evidence.
///
/// # Example
/// ```ignore
/// use scholar_flow::refinery::{DisciplineModel, Evidence, Refinery};
///
/// let model = DisciplineModel::with_default_corpus()?;
/// let refinery = Refinery::new(&model);
/// let profile = refinery.profile(&Evidence { title: Some("Deep learning"), ..Default::default() }, None);
/// println!("{} ({:.2})", profile.discipline, profile.confidence);
/// ```
pub struct Refinery<'m> {
    model: &'m DisciplineModel,
}

impl<'m> Refinery<'m> {
    pub fn new(model: &'m DisciplineModel) -> Self {
        Self { model }
    }

    /// A caller-supplied type hint replaces detection.
    pub fn profile(&self, evidence: &Evidence<'_>, type_hint: Option<DocumentType>) -> TextProfile {
        let text = evidence.classification_text();
        let classification = self.model.classify(text);
        let document_type = type_hint.unwrap_or_else(|| {
            detect_type(
                evidence.url,
                evidence.title,
                evidence.abstract_text,
                evidence.full_text,
            )
        });

        TextProfile {
            discipline: classification.label,
            confidence: classification.confidence,
            keywords: extract_keywords(text),
            document_type,
        }
    }
}
