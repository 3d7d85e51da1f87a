use scholar_flow::engine::normalization::{canonicalize_url, UrlRejection};

// * Test Suite for submitted URL canonicalization

#[test]
fn test_strip_fragment() {
    let url = canonicalize_url("https://arxiv.org/abs/1706.03762#section1").unwrap();
    assert_eq!(url.as_str(), "https://arxiv.org/abs/1706.03762");
}

#[test]
fn test_lowercase_host() {
    let url = canonicalize_url("https://ArXiv.ORG/abs/1706.03762").unwrap();
    assert_eq!(url.as_str(), "https://arxiv.org/abs/1706.03762");
}

#[test]
fn test_tracking_param_removal() {
    let url = canonicalize_url("https://example.org/paper?id=123&utm_source=google&gclid=xyz&sort=asc").unwrap();
    let normalized = url.as_str();
    assert!(normalized.contains("id=123"));
    assert!(normalized.contains("sort=asc"));
    assert!(!normalized.contains("utm_source"));
    assert!(!normalized.contains("gclid"));
}

#[test]
fn test_query_sorting() {
    let url = canonicalize_url("https://scholar.google.com/scholar?q=attention&hl=en").unwrap();
    assert_eq!(url.as_str(), "https://scholar.google.com/scholar?hl=en&q=attention");
}

#[test]
fn test_only_tracking_params_drops_query() {
    let url = canonicalize_url("https://example.org/paper?utm_campaign=x").unwrap();
    assert_eq!(url.as_str(), "https://example.org/paper");
}

#[test]
fn test_non_web_scheme() {
    assert_eq!(
        canonicalize_url("file:///etc/passwd"),
        Err(UrlRejection::Scheme("file".to_string()))
    );
}
