pub mod constants;
pub mod settings;

pub use settings::{ConfigError, PipelineSettings};
