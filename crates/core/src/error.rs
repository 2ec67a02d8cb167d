use thiserror::Error;

/// Failure of [`crate::config::EnvConfig::load`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Config(String),
}
