// * Discipline classification: multinomial naive Bayes over normalized text
// * The model is built once by `train_classifier` and never mutated afterwards,
// * so it can be shared across requests behind an `Arc` without locking.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::config::constants::DEFAULT_DISCIPLINE;
use crate::refinery::keywords::is_stop_word;
use crate::refinery::text::tokenize;

/// One labeled training document.
#[derive(Debug, Clone, Copy)]
pub struct TrainingDocument<'a> {
    pub text: &'a str,
    pub label: &'a str,
}

const fn doc<'a>(text: &'a str, label: &'a str) -> TrainingDocument<'a> {
    TrainingDocument { text, label }
}

// * Built-in labeled corpus used at process start
pub const DEFAULT_CORPUS: &[TrainingDocument<'static>] = &[
    doc("machine learning artificial intelligence neural network deep learning algorithm", "Computer Science"),
    doc("software engineering programming database system architecture", "Computer Science"),
    doc("data mining big data analytics visualization computing", "Computer Science"),
    doc("cybersecurity encryption network security protocol", "Computer Science"),
    doc("dna genetic protein biology molecular cell organism", "Biology"),
    doc("evolution ecology biodiversity ecosystem species", "Biology"),
    doc("medicine medical health disease treatment diagnosis", "Medicine"),
    doc("pharmaceutical drug therapy clinical trial", "Medicine"),
    doc("marketing consumer behavior business strategy management", "Business"),
    doc("economics finance market economy investment", "Economics"),
    doc("accounting financial analysis revenue profit", "Business"),
    doc("mechanical engineering design manufacturing material", "Engineering"),
    doc("electrical circuit electronics power system", "Engineering"),
    doc("civil engineering construction building infrastructure", "Engineering"),
    doc("physics quantum mechanics thermodynamics particle", "Physics"),
    doc("chemistry chemical reaction compound molecular structure", "Chemistry"),
    doc("psychology behavior cognitive social interaction", "Psychology"),
    doc("sociology society culture community social", "Sociology"),
    doc("education learning teaching pedagogy curriculum", "Education"),
    doc("mathematics mathematical statistics probability theorem", "Mathematics"),
    doc("algebra calculus geometry topology analysis", "Mathematics"),
    doc("environment climate change sustainability pollution", "Environmental Science"),
    doc("renewable energy solar wind environmental impact", "Environmental Science"),
];

#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error("Training corpus is empty")]
    EmptyCorpus,

    #[error("Training document {0} has no usable tokens")]
    EmptyDocument(usize),

    #[error("Training document {0} has a blank label")]
    BlankLabel(usize),
}

/// A label with its posterior probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn general() -> Self {
        Self {
            label: DEFAULT_DISCIPLINE.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_general(&self) -> bool {
        self.label == DEFAULT_DISCIPLINE
    }
}

#[derive(Debug)]
struct LabelStats {
    label: String,
    doc_count: usize,
    token_counts: HashMap<String, usize>,
    total_tokens: usize,
}

/// Trained discipline model.
#[derive(Debug)]
pub struct DisciplineModel {
    // * Kept in first-seen corpus order so ties resolve deterministically
    labels: Vec<LabelStats>,
    vocabulary: HashSet<String>,
    total_docs: usize,
}

// * Plural suffix stripping; applied to corpus and queries alike
fn stem(token: String) -> String {
    if token.len() <= 4 || token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
        return token;
    }
    if let Some(base) = token.strip_suffix("ies") {
        return format!("{}y", base);
    }
    match token.strip_suffix('s') {
        Some(base) => base.to_string(),
        None => token,
    }
}

fn features(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .map(stem)
        .collect()
}

/// Builds an immutable model from a labeled corpus.
pub fn train_classifier(corpus: &[TrainingDocument<'_>]) -> Result<DisciplineModel, TrainingError> {
    if corpus.is_empty() {
        return Err(TrainingError::EmptyCorpus);
    }

    let mut labels: Vec<LabelStats> = Vec::new();
    let mut vocabulary = HashSet::new();

    for (index, document) in corpus.iter().enumerate() {
        let label = document.label.trim();
        if label.is_empty() {
            return Err(TrainingError::BlankLabel(index));
        }

        let tokens = features(document.text);
        if tokens.is_empty() {
            return Err(TrainingError::EmptyDocument(index));
        }

        let position = match labels.iter().position(|s| s.label == label) {
            Some(position) => position,
            None => {
                labels.push(LabelStats {
                    label: label.to_string(),
                    doc_count: 0,
                    token_counts: HashMap::new(),
                    total_tokens: 0,
                });
                labels.len() - 1
            }
        };

        let stats = &mut labels[position];
        stats.doc_count += 1;
        for token in tokens {
            stats.total_tokens += 1;
            *stats.token_counts.entry(token.clone()).or_insert(0) += 1;
            vocabulary.insert(token);
        }
    }

    tracing::debug!(
        labels = labels.len(),
        vocabulary = vocabulary.len(),
        documents = corpus.len(),
        "Discipline classifier trained"
    );

    Ok(DisciplineModel {
        labels,
        vocabulary,
        total_docs: corpus.len(),
    })
}

impl DisciplineModel {
    /// Trains on the built-in corpus.
    pub fn with_default_corpus() -> Result<Self, TrainingError> {
        train_classifier(DEFAULT_CORPUS)
    }

    /// Returns the best label, or `General` with zero confidence for blank input.
    pub fn classify(&self, text: &str) -> Classification {
        self.classify_with_confidence(text)
            .into_iter()
            .next()
            .unwrap_or_else(Classification::general)
    }

    /// Returns every label ranked by posterior probability (sums to 1).
    ///
    /// Blank input yields a single `General` entry with confidence 0. Text
    /// sharing no vocabulary with the corpus is ranked on the label priors.
    pub fn classify_with_confidence(&self, text: &str) -> Vec<Classification> {
        if text.trim().is_empty() {
            return vec![Classification::general()];
        }

        let tokens: Vec<String> = features(text)
            .into_iter()
            .filter(|t| self.vocabulary.contains(t))
            .collect();

        let scores = self.log_scores(&tokens);
        match posteriors(&scores) {
            Some(probabilities) => {
                let mut ranked: Vec<Classification> = self
                    .labels
                    .iter()
                    .zip(probabilities)
                    .map(|(stats, confidence)| Classification {
                        label: stats.label.clone(),
                        confidence,
                    })
                    .collect();
                // * Stable sort keeps corpus order among equal scores
                ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
                ranked
            }
            None => {
                tracing::warn!("Non-finite classifier scores, falling back to default discipline");
                vec![Classification::general()]
            }
        }
    }

    /// Labels known to the model, in corpus order.
    pub fn labels(&self) -> Vec<&str> {
        self.labels.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn log_scores(&self, tokens: &[String]) -> Vec<f64> {
        let vocab = self.vocabulary.len() as f64;
        self.labels
            .iter()
            .map(|stats| {
                let prior = (stats.doc_count as f64 / self.total_docs as f64).ln();
                let denominator = stats.total_tokens as f64 + vocab;
                tokens.iter().fold(prior, |acc, token| {
                    let count = stats.token_counts.get(token).copied().unwrap_or(0) as f64;
                    // * Laplace smoothing
                    acc + ((count + 1.0) / denominator).ln()
                })
            })
            .collect()
    }
}

// * Softmax over log scores; None when any score is not finite
fn posteriors(log_scores: &[f64]) -> Option<Vec<f64>> {
    if log_scores.is_empty() || log_scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let max = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = log_scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(exps.into_iter().map(|e| (e / total).clamp(0.0, 1.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DisciplineModel {
        DisciplineModel::with_default_corpus().unwrap()
    }

    #[test]
    fn test_blank_input_is_general() {
        let model = model();
        assert_eq!(model.classify(""), Classification::general());
        assert_eq!(model.classify("   \n"), Classification::general());
        assert_eq!(model.classify_with_confidence("  "), vec![Classification::general()]);
    }

    #[test]
    fn test_out_of_vocabulary_ranks_on_priors() {
        let model = model();
        let ranked = model.classify_with_confidence("Attention Is All You Need");
        assert_eq!(ranked.len(), 13);
        // * Computer Science has the most training documents (4 of 23)
        assert_eq!(ranked[0].label, "Computer Science");
        assert!((ranked[0].confidence - 4.0 / 23.0).abs() < 1e-9);
        assert!(!model.classify("zzzz qqqq xxxx").is_general());
    }

    #[test]
    fn test_plurals_match_corpus() {
        let model = model();
        let result = model.classify("Convolutional networks for images");
        assert_eq!(result.label, "Computer Science");
        assert!(result.confidence > 4.0 / 23.0);
        assert_eq!(model.classify("Proteins and cells").label, "Biology");
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("networks".to_string()), "network");
        assert_eq!(stem("studies".to_string()), "study");
        assert_eq!(stem("analysis".to_string()), "analysis");
        assert_eq!(stem("business".to_string()), "business");
        assert_eq!(stem("gas".to_string()), "gas");
    }

    #[test]
    fn test_computer_science() {
        let result = model().classify("A deep neural network algorithm for machine learning");
        assert_eq!(result.label, "Computer Science");
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    }

    #[test]
    fn test_other_disciplines() {
        let model = model();
        assert_eq!(model.classify("Quantum mechanics of particle thermodynamics").label, "Physics");
        assert_eq!(model.classify("Clinical trial of a new drug therapy").label, "Medicine");
        assert_eq!(model.classify("Climate change and pollution sustainability").label, "Environmental Science");
        assert_eq!(model.classify("Teaching pedagogy and curriculum design in education").label, "Education");
    }

    #[test]
    fn test_ranked_probabilities_sum_to_one() {
        let ranked = model().classify_with_confidence("protein dna cell biology");
        assert_eq!(ranked[0].label, "Biology");
        assert_eq!(ranked.len(), 13);
        let total: f64 = ranked.iter().map(|c| c.confidence).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_training_errors() {
        assert_eq!(train_classifier(&[]).unwrap_err(), TrainingError::EmptyCorpus);
        assert_eq!(
            train_classifier(&[doc("the and of", "Nothing")]).unwrap_err(),
            TrainingError::EmptyDocument(0)
        );
        assert_eq!(
            train_classifier(&[doc("graph theory", "  ")]).unwrap_err(),
            TrainingError::BlankLabel(0)
        );
    }

    #[test]
    fn test_custom_corpus() {
        let model = train_classifier(&[
            doc("rust borrow checker ownership", "Rust"),
            doc("garbage collector runtime heap", "Java"),
        ])
        .unwrap();
        assert_eq!(model.labels(), vec!["Rust", "Java"]);
        assert_eq!(model.classify("ownership and borrow").label, "Rust");
    }

    #[test]
    fn test_posteriors_rejects_non_finite() {
        assert!(posteriors(&[f64::NAN, 0.0]).is_none());
        assert!(posteriors(&[]).is_none());
    }

    #[test]
    fn test_model_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DisciplineModel>();
    }
}
