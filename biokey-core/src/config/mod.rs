//! Configuration management for biokey
//!
//! Environment-based configuration with defaults, TOML files and validation.
//! The derivation defaults reproduce the reference key scheme exactly; only
//! change them if every party deriving keys for the same wallet agrees.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Salt namespace mixed into every deterministic salt
pub const DEFAULT_SALT_PREFIX: &str = "TG_BIOMETRIC_";

/// PBKDF2-HMAC-SHA256 rounds per derivation
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Number of keys produced by `derive_multiple_keys` when unspecified
pub const DEFAULT_KEY_COUNT: u32 = 3;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key derivation parameters
    pub derivation: DerivationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Session store configuration
    pub store: StoreConfig,
}

/// Which user ids are accepted as derivation input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserIdPolicy {
    /// Any integer, including zero and negatives
    #[default]
    Any,
    /// Strictly positive ids only
    Positive,
}

impl std::str::FromStr for UserIdPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(UserIdPolicy::Any),
            "positive" => Ok(UserIdPolicy::Positive),
            other => Err(ConfigError::InvalidValue(format!(
                "Invalid user id policy: {}",
                other
            ))),
        }
    }
}

/// Key derivation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// PBKDF2 iteration count
    pub iterations: u32,

    /// Prefix hashed together with device and user id into the salt
    pub salt_prefix: String,

    /// Key count for multi-key derivation
    pub default_key_count: u32,

    /// Coin type written into derivation path labels
    pub coin_type: u32,

    /// User id acceptance policy
    pub user_id_policy: UserIdPolicy,

    /// Derivations slower than this are logged as warnings
    #[serde(with = "humantime_serde")]
    pub slow_derivation_threshold: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding persisted session records (`~` is expanded by the CLI)
    pub session_dir: PathBuf,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            salt_prefix: DEFAULT_SALT_PREFIX.to_string(),
            default_key_count: DEFAULT_KEY_COUNT,
            coin_type: crate::core_keys::SOLANA_COIN_TYPE,
            user_id_policy: UserIdPolicy::Any,
            slow_derivation_threshold: Duration::from_secs(2),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            session_dir: PathBuf::from("~/.biokey/sessions"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: BIOKEY_<SECTION>_<KEY>
    /// Example: BIOKEY_DERIVATION_ITERATIONS=100000
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let mut config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Derivation config
        if let Ok(iterations) = env::var("BIOKEY_DERIVATION_ITERATIONS") {
            self.derivation.iterations = iterations
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid iterations: {}", e)))?;
        }
        if let Ok(prefix) = env::var("BIOKEY_DERIVATION_SALT_PREFIX") {
            self.derivation.salt_prefix = prefix;
        }
        if let Ok(count) = env::var("BIOKEY_DERIVATION_KEY_COUNT") {
            self.derivation.default_key_count = count
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid key count: {}", e)))?;
        }
        if let Ok(policy) = env::var("BIOKEY_DERIVATION_USER_ID_POLICY") {
            self.derivation.user_id_policy = policy.parse()?;
        }
        if let Ok(threshold) = env::var("BIOKEY_DERIVATION_SLOW_THRESHOLD") {
            self.derivation.slow_derivation_threshold = humantime_serde::re::humantime::parse_duration(&threshold)
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid slow threshold: {}", e)))?;
        }

        // Logging config
        if let Ok(level) = env::var("BIOKEY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("BIOKEY_LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        // Store config
        if let Ok(dir) = env::var("BIOKEY_STORE_SESSION_DIR") {
            self.store.session_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.derivation.iterations == 0 {
            return Err(ConfigError::ValidationFailed(
                "iterations must be greater than 0".to_string(),
            ));
        }

        if self.derivation.salt_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "salt_prefix must not be empty".to_string(),
            ));
        }

        if self.derivation.default_key_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "default_key_count must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
