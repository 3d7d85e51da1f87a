// * Runtime settings for the extraction pipeline
// * Layered: built-in defaults -> optional TOML file -> SCHOLAR_FLOW_* environment

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::constants::{
    DEFAULT_METRICS_PORT, DEFAULT_UPLOAD_DIR, MAX_PDF_BYTES, MAX_RENDER_SESSIONS,
    PAGE_TIMEOUT_MS, RENDER_QUEUE_TIMEOUT_SECS, RENDER_SETTLE_MS, RENDER_TIMEOUT_SECS,
    STATIC_TIMEOUT_SECS,
};

// * Environment prefix, e.g. SCHOLAR_FLOW_MAX_RENDER_SESSIONS=4
pub const ENV_PREFIX: &str = "SCHOLAR_FLOW_";

// * Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "scholar-flow.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for fetching, rendering and storage selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub static_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub page_timeout_ms: u64,
    pub render_settle_ms: u64,
    pub max_render_sessions: usize,
    pub render_queue_timeout_secs: u64,
    pub max_pdf_bytes: usize,
    pub headless: bool,
    pub upload_dir: PathBuf,
    pub redis_url: Option<String>,
    pub metrics_port: Option<u16>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            static_timeout_secs: STATIC_TIMEOUT_SECS,
            render_timeout_secs: RENDER_TIMEOUT_SECS,
            page_timeout_ms: PAGE_TIMEOUT_MS,
            render_settle_ms: RENDER_SETTLE_MS,
            max_render_sessions: MAX_RENDER_SESSIONS,
            render_queue_timeout_secs: RENDER_QUEUE_TIMEOUT_SECS,
            max_pdf_bytes: MAX_PDF_BYTES,
            headless: true,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            redis_url: None,
            metrics_port: Some(DEFAULT_METRICS_PORT),
        }
    }
}

impl PipelineSettings {
    /// Loads settings from `scholar-flow.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads settings, reading the given TOML file instead of the default one.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if file.exists() {
            figment = figment.merge(Toml::file(&file));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(figment)
    }

    /// Extracts and validates settings from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Self = figment.extract().map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_render_sessions == 0 {
            return Err(ConfigError::Invalid(
                "max_render_sessions must be at least 1".to_string(),
            ));
        }
        if self.static_timeout_secs == 0 || self.render_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        if self.max_pdf_bytes == 0 {
            return Err(ConfigError::Invalid("max_pdf_bytes must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn static_timeout(&self) -> Duration {
        Duration::from_secs(self.static_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    pub fn render_queue_timeout(&self) -> Duration {
        Duration::from_secs(self.render_queue_timeout_secs)
    }
}
