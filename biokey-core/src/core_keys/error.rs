//! Error types for key derivation

use thiserror::Error;

/// Errors raised by the derivation engine.
///
/// Only caller mistakes and malformed data end up here. A biometric token
/// that simply does not reproduce the expected identity is an expected
/// outcome and is reported as `false` / `None` by the validating helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyDerivationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Deliberately generic so parser details never reach the caller.
    #[error("Invalid backup data")]
    InvalidBackup,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A background derivation was cancelled before it finished
    #[error("Derivation interrupted: {0}")]
    Interrupted(String),
}

impl KeyDerivationError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        KeyDerivationError::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_backup_message_is_generic() {
        assert_eq!(KeyDerivationError::InvalidBackup.to_string(), "Invalid backup data");
    }

    #[test]
    fn test_invalid_input_display() {
        let err = KeyDerivationError::invalid_input("biometric token must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid input: biometric token must not be empty"
        );
    }
}
