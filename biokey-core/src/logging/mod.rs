//! Logging subsystem for biokey
//!
//! Thin setup around `tracing-subscriber`. Output goes to stderr so command
//! output on stdout stays machine-readable. `RUST_LOG` takes precedence over
//! the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod level;

pub use error::LoggingError;
pub use level::LogLevel;

use crate::config::LoggingConfig;

/// Configuration for the logging subsystem
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub with_timestamp: bool,
    pub with_target: bool,
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamp: true,
            with_target: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Build from the `[logging]` section of the application config
    pub fn from_config(config: &LoggingConfig) -> Result<Self, LoggingError> {
        let level = config.level.parse::<LogLevel>()?;
        Ok(Self {
            level,
            with_timestamp: config.with_timestamp,
            with_target: config.with_target,
            json_format: config.json_format,
        })
    }

    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.with_timestamp = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }
}

/// Initialize the logging subsystem with default configuration
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize the logging subsystem with custom configuration
///
/// # Example
/// ```
/// use biokey_core::logging::{init_logging_with_config, LogConfig, LogLevel};
///
/// let config = LogConfig::new(LogLevel::Debug).with_target(false);
/// init_logging_with_config(config).expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    let result = match (config.json_format, config.with_timestamp) {
        (true, true) => registry.with(layer.json()).try_init(),
        (true, false) => registry.with(layer.json().without_time()).try_init(),
        (false, true) => registry.with(layer).try_init(),
        (false, false) => registry.with(layer.without_time()).try_init(),
    };

    result.map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.with_timestamp);
        assert!(config.with_target);
        assert!(!config.json_format);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new(LogLevel::Debug)
            .with_timestamp(false)
            .with_target(false)
            .json_format(true);

        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.with_timestamp);
        assert!(!config.with_target);
        assert!(config.json_format);
    }

    #[test]
    fn test_from_config() {
        let section = LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            with_timestamp: false,
            with_target: true,
        };
        let config = LogConfig::from_config(&section).unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert!(config.json_format);
        assert!(!config.with_timestamp);
    }

    #[test]
    fn test_from_config_rejects_unknown_level() {
        let section = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            LogConfig::from_config(&section),
            Err(LoggingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_second_init_fails() {
        // Whichever test initializes first wins the global subscriber.
        let _ = init_logging_with_config(LogConfig::new(LogLevel::Error));
        assert!(init_logging().is_err());
    }
}
