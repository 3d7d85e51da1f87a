use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::sync::atomic::{AtomicUsize, Ordering};

// * Realistic desktop browser identities rotated per request
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

pub const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";
pub const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

// * IdentityProfile defines the browser characteristics presented to a site.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
    pub accept: &'static str,
}

impl IdentityProfile {
    pub fn new(user_agent: &'static str) -> Self {
        Self {
            user_agent,
            accept_language: ACCEPT_LANGUAGE_VALUE,
            accept: ACCEPT_HTML,
        }
    }

    /// Is this a Chromium-family identity (sends client hints).
    pub fn is_chromium(&self) -> bool {
        self.user_agent.contains("Chrome/")
    }

    // * Applies the profile to a mutable HeaderMap.
    pub fn apply_to_headers(&self, headers: &mut HeaderMap) {
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(self.accept_language));
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        if self.is_chromium() {
            headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        }
    }

    /// Extra headers for a browser page, as (name, value) pairs.
    pub fn page_headers(&self) -> Vec<(&'static str, &'static str)> {
        vec![("Accept-Language", self.accept_language), ("Accept", self.accept)]
    }
}

impl Default for IdentityProfile {
    fn default() -> Self {
        Self::new(USER_AGENTS[0])
    }
}

// * Round-robin over the user-agent pool; shared across tasks.
#[derive(Debug, Default)]
pub struct IdentityRotator {
    next: AtomicUsize,
}

impl IdentityRotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_profile(&self) -> IdentityProfile {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
        IdentityProfile::new(USER_AGENTS[idx])
    }
}
