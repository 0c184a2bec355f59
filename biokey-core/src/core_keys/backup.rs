//! Key backups
//!
//! A backup records only what is needed to rebuild the derivation salt:
//!
//! ```text
//! base64( {"deviceId":"...","userId":42,"salt":"<hex sha256>","timestamp":<ms>,"version":"1.0"} )
//! ```
//!
//! It is safe to store server-side. Reconstructing a key still requires the
//! biometric token, which is never written into a backup.

use super::engine::KeyDerivationEngine;
use super::error::KeyDerivationError;
use super::salt::is_digest_hex;
use super::types::{unix_millis_now, DerivationParams};
use crate::metrics;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Backup format written by this crate
pub const BACKUP_VERSION: &str = "1.0";

/// Accepts padded and unpadded input; always written padded.
const BACKUP_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Wire representation of a backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBackup {
    pub device_id: String,
    pub user_id: i64,
    pub salt: String,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: u64,
    pub version: String,
}

impl KeyBackup {
    pub fn encode(&self) -> Result<String, KeyDerivationError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| KeyDerivationError::InvalidInput(format!("Backup serialization failed: {}", e)))?;
        Ok(STANDARD.encode(json))
    }

    /// Parse a backup blob. Every failure collapses into `InvalidBackup`.
    pub fn decode(blob: &str) -> Result<Self, KeyDerivationError> {
        let bytes = BACKUP_DECODER
            .decode(blob.trim())
            .map_err(|e| reject("base64", &e))?;
        let backup: KeyBackup = serde_json::from_slice(&bytes).map_err(|e| reject("json", &e))?;

        if backup.device_id.is_empty() {
            return Err(reject("fields", &"empty device id"));
        }
        if !is_digest_hex(&backup.salt) {
            return Err(reject("fields", &"salt is not a sha256 hex digest"));
        }
        if backup.version.split('.').next() != Some("1") {
            return Err(reject("version", &backup.version));
        }

        Ok(backup)
    }
}

fn reject(stage: &'static str, cause: &dyn std::fmt::Display) -> KeyDerivationError {
    metrics::record_counter(metrics::BACKUPS_REJECTED, 1);
    warn!(stage, cause = %cause, "Rejected key backup");
    KeyDerivationError::InvalidBackup
}

/// Derivation inputs recovered from a backup. Carries no token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredParams {
    pub device_id: String,
    pub user_id: i64,
    pub salt: String,
}

impl RestoredParams {
    /// Rebuild full derivation params once the token has been presented again
    pub fn into_params(self, biometric_token: impl Into<String>) -> DerivationParams {
        DerivationParams::new(biometric_token, self.device_id, self.user_id).with_salt(self.salt)
    }
}

impl From<KeyBackup> for RestoredParams {
    fn from(backup: KeyBackup) -> Self {
        RestoredParams {
            device_id: backup.device_id,
            user_id: backup.user_id,
            salt: backup.salt,
        }
    }
}

impl KeyDerivationEngine {
    /// Build a base64 backup of the salt inputs for `params`.
    ///
    /// The token in `params` is neither required nor recorded.
    pub fn create_key_backup(&self, params: &DerivationParams) -> Result<String, KeyDerivationError> {
        self.check_identifiers(&params.device_id, params.user_id)?;

        let backup = KeyBackup {
            device_id: params.device_id.clone(),
            user_id: params.user_id,
            salt: self.deterministic_salt(&params.device_id, params.user_id),
            timestamp: unix_millis_now(),
            version: BACKUP_VERSION.to_string(),
        };

        let encoded = backup.encode()?;
        metrics::record_counter(metrics::BACKUPS_CREATED, 1);
        debug!(device_id = %backup.device_id, user_id = backup.user_id, "Created key backup");
        Ok(encoded)
    }

    /// Recover device id, user id and salt from a backup blob
    pub fn restore_from_backup(&self, backup: &str) -> Result<RestoredParams, KeyDerivationError> {
        let backup = KeyBackup::decode(backup)?;
        metrics::record_counter(metrics::BACKUPS_RESTORED, 1);
        Ok(backup.into())
    }
}
