// * Text normalization shared by classification and keyword extraction

use regex::Regex;
use std::sync::LazyLock;

// * Any run of non-word characters (punctuation, symbols, whitespace)
static NON_WORD_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Lowercases, turns every run of non-word characters into a single space and trims.
///
/// Pure and idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    NON_WORD_RUN.replace_all(&lower, " ").trim().to_string()
}

/// Normalizes and splits on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Collapses internal whitespace of scraped text without changing case.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("  Deep-Learning:\tA   Survey.  "), "deep learning a survey");
    }

    #[test]
    fn test_normalize_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
        assert_eq!(normalize("?!..."), "");
    }

    #[test]
    fn test_normalize_keeps_digits_and_underscore() {
        assert_eq!(normalize("GPT_4 (2023)"), "gpt_4 2023");
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "The Quick, Brown fox -- jumps!",
            "Ünïcödé Téxt — with dashes",
            "already normalized text",
            "  \u{00A0}non-breaking\u{00A0}space ",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Machine learning, machine!"), vec!["machine", "learning", "machine"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  A  Study\n of   Things "), "A Study of Things");
    }
}
