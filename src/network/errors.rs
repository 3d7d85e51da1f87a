use thiserror::Error;

// * Unified Error type for the Network Layer.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Soft Ban detected: {0}")]
    SoftBan(String),

    #[error("HTTP {0} Forbidden/Blocked")]
    HardBan(u16),

    #[error("HTTP {0} from upstream")]
    Status(u16),

    #[error("Empty response body")]
    EmptyResponse,

    #[error("Response exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl NetworkError {
    /// Blocked by the site rather than failed.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::SoftBan(_) | Self::HardBan(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}
