// * Frequency-ranked keyword extraction
// * Ranking: count desc, then first appearance in the token stream

use std::collections::HashMap;

use crate::config::constants::MAX_KEYWORDS;
use crate::refinery::text::tokenize;

// * Common English function words excluded from keywords and classifier features
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "can", "this", "that",
    "these", "those", "i", "me", "my", "mine", "we", "us", "our", "ours", "you", "your",
    "yours", "he", "him", "his", "she", "her", "hers", "it", "its", "they", "them", "their",
    "theirs",
];

// * Tokens this short never become keywords
const MIN_KEYWORD_LEN: usize = 4;

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

fn is_keyword_candidate(token: &str) -> bool {
    token.len() >= MIN_KEYWORD_LEN
        && token.bytes().all(|b| b.is_ascii_alphabetic())
        && !is_stop_word(token)
}

/// Returns at most ten lowercase alphabetic keywords, most frequent first.
pub fn extract_keywords(text: &str) -> Vec<String> {
    extract_top_keywords(text, MAX_KEYWORDS)
}

/// Same ranking as [`extract_keywords`] with a caller-chosen limit.
pub fn extract_top_keywords(text: &str, limit: usize) -> Vec<String> {
    // * (count, first position) per token
    let mut stats: HashMap<String, (usize, usize)> = HashMap::new();

    for (position, token) in tokenize(text)
        .into_iter()
        .filter(|t| is_keyword_candidate(t))
        .enumerate()
    {
        stats
            .entry(token)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    let mut ranked: Vec<(String, usize, usize)> = stats
        .into_iter()
        .map(|(token, (count, first))| (token, count, first))
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(token, _, _)| token)
        .collect()
}
