// * Main-content and visible-text helpers over parsed HTML
// * Content cascade: article -> .content -> .main -> #content -> main -> capped body text

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::config::constants::BODY_TEXT_LIMIT;
use crate::refinery::text::collapse_whitespace;

static SELECTOR_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static SELECTOR_H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static SELECTOR_BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

// * Main content areas in priority order
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["article", ".content", ".main", "#content", "main"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

// * Elements whose text never reaches the reader
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Text of an element with scripts and styles skipped, whitespace collapsed.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_TAGS.contains(&el.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

/// Text of the first element matching the selector, if non-empty.
pub fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(visible_text)
        .find(|t| !t.is_empty())
}

/// `<title>`, then first `<h1>`.
pub fn page_title(document: &Html) -> Option<String> {
    first_text(document, &SELECTOR_TITLE).or_else(|| first_text(document, &SELECTOR_H1))
}

/// Text of the first main-content container that has any.
pub fn main_content(document: &Html) -> Option<String> {
    CONTENT_SELECTORS
        .iter()
        .find_map(|selector| first_text(document, selector))
}

/// Visible body text truncated to `limit` characters.
pub fn body_text(document: &Html, limit: usize) -> Option<String> {
    let body = document.select(&SELECTOR_BODY).next()?;
    let text: String = visible_text(body).chars().take(limit).collect();
    (!text.is_empty()).then_some(text)
}

/// Main content if a container exists, else capped body text.
pub fn readable_text(document: &Html) -> Option<String> {
    main_content(document).or_else(|| body_text(document, BODY_TEXT_LIMIT))
}
