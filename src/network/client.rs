use crate::network::errors::NetworkError;
use crate::network::identity::IdentityProfile;
use futures::StreamExt;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

// * Challenge-page titles served instead of content
static BAN_TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<title[^>]*>[^<]*(Just a moment|Attention Required|Security Check|Access Denied|Captcha)[^<]*</title>")
        .unwrap()
});

// * Bot-wall markers embedded in otherwise normal-looking pages
const BAN_BODY_SIGNATURES: [&str; 4] = [
    "captcha-delivery",
    "cf-turnstile",
    "datadome",
    "challenge-platform",
];

// * The HTTP engine for static fetches.
#[derive(Clone)]
pub struct FastClient {
    inner: Client,
}

impl FastClient {
    // * Initializes the client with a cookie store and a request deadline.
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .build()?;

        Ok(Self { inner: client })
    }

    // * Fetches a URL as text and validates the response against ban rules.
    pub async fn fetch(&self, url: &str, identity: &IdentityProfile) -> Result<String, NetworkError> {
        let resp = self.get(url, identity).await?;

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(NetworkError::EmptyResponse);
        }

        detect_soft_ban(&body)?;

        Ok(body)
    }

    // * Fetches a binary body, refusing anything larger than `max_bytes`.
    pub async fn fetch_bytes(
        &self,
        url: &str,
        identity: &IdentityProfile,
        max_bytes: usize,
    ) -> Result<Vec<u8>, NetworkError> {
        let resp = self.get(url, identity).await?;

        if let Some(length) = resp.content_length() {
            if length as usize > max_bytes {
                return Err(NetworkError::TooLarge { limit: max_bytes });
            }
        }

        // * Content-Length may be absent or wrong; enforce the cap while streaming
        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > max_bytes {
                return Err(NetworkError::TooLarge { limit: max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        if body.is_empty() {
            return Err(NetworkError::EmptyResponse);
        }

        crate::ops::telemetry::record_pdf_bytes(body.len());
        Ok(body)
    }

    async fn get(&self, url: &str, identity: &IdentityProfile) -> Result<reqwest::Response, NetworkError> {
        let parsed = url::Url::parse(url).map_err(|_| NetworkError::InvalidUrl(url.to_string()))?;

        let mut headers = HeaderMap::new();
        identity.apply_to_headers(&mut headers);

        let resp = self.inner.get(parsed).headers(headers).send().await?;
        let status = resp.status();

        if status.as_u16() == 403 || status.as_u16() == 429 {
            return Err(NetworkError::HardBan(status.as_u16()));
        }

        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }

        Ok(resp)
    }
}

pub fn detect_soft_ban(body: &str) -> Result<(), NetworkError> {
    if let Some(cap) = BAN_TITLE_REGEX.captures(body) {
        let trigger = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Err(NetworkError::SoftBan(format!("Title Trigger: {}", trigger)));
    }

    for sig in BAN_BODY_SIGNATURES {
        if body.contains(sig) {
            return Err(NetworkError::SoftBan(format!("Body Trigger: {}", sig)));
        }
    }

    Ok(())
}
