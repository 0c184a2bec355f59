//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(String),

    #[error("Failed to write config file: {0}")]
    FileWriteError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    /// An environment override could not be parsed
    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("Config validation failed: {0}")]
    ValidationFailed(String),
}
