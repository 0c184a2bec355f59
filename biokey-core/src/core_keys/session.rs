//! Biometric sessions
//!
//! A session binds a user and device to the public key their biometric token
//! reproduces. The private key is never stored: re-authentication derives it
//! again from a fresh token and only hands it out if the public key matches.

use super::backup::RestoredParams;
use super::engine::KeyDerivationEngine;
use super::error::KeyDerivationError;
use super::types::{unix_millis_now, BiometricType, DerivationParams};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricSession {
    pub user_id: i64,
    pub device_id: String,
    /// Token from the most recent capture. In memory only, never serialized.
    #[serde(skip)]
    biometric_token: Option<SecretString>,
    pub biometric_type: BiometricType,
    pub public_key: String,
    pub is_enabled: bool,
    /// Milliseconds since the Unix epoch
    pub created_at: u64,
    pub last_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_backup: Option<String>,
}

impl BiometricSession {
    pub fn has_token(&self) -> bool {
        self.biometric_token.is_some()
    }

    /// Copy of this session safe to hand to a store
    pub fn without_token(&self) -> Self {
        Self {
            biometric_token: None,
            ..self.clone()
        }
    }

    /// Record a successful use
    pub fn touch(&mut self) {
        self.last_used = unix_millis_now().max(self.last_used);
    }

    pub fn disable(&mut self) {
        self.is_enabled = false;
        self.biometric_token = None;
    }

    /// Decode the embedded key backup, if any
    pub fn restore_params(&self, engine: &KeyDerivationEngine) -> Option<Result<RestoredParams, KeyDerivationError>> {
        self.key_backup.as_deref().map(|blob| engine.restore_from_backup(blob))
    }
}

impl KeyDerivationEngine {
    /// Derive a key and wrap it into an enabled session with a key backup
    pub fn create_biometric_session(
        &self,
        user_id: i64,
        device_id: &str,
        biometric_token: &str,
        biometric_type: BiometricType,
    ) -> Result<BiometricSession, KeyDerivationError> {
        let params = DerivationParams::new(biometric_token, device_id, user_id)
            .with_biometric_type(biometric_type);

        let key = self.derive_private_key(&params)?;
        let backup = self.create_key_backup(&params)?;
        let now = unix_millis_now();

        info!(user_id, device_id, public_key = %key.public_key, "Created biometric session");

        Ok(BiometricSession {
            user_id,
            device_id: device_id.to_string(),
            biometric_token: Some(SecretString::new(biometric_token.to_string())),
            biometric_type,
            public_key: key.public_key.clone(),
            is_enabled: true,
            created_at: now,
            last_used: now,
            key_backup: Some(backup),
        })
    }

    /// Re-derive the private key for `session` from a freshly captured token.
    ///
    /// Returns `None` when the token does not reproduce the session's public
    /// key or derivation fails.
    pub fn recreate_private_key(&self, session: &BiometricSession, current_token: &str) -> Option<String> {
        let params = DerivationParams::new(current_token, session.device_id.as_str(), session.user_id)
            .with_biometric_type(session.biometric_type);

        match self.derive_private_key(&params) {
            Ok(key) if key.public_key == session.public_key => {
                debug!(user_id = session.user_id, "Biometric token reproduced session key");
                Some(key.private_key.clone())
            }
            Ok(_) => {
                debug!(user_id = session.user_id, "Biometric token did not match session key");
                None
            }
            Err(e) => {
                warn!(user_id = session.user_id, error = %e, "Failed to recreate private key");
                None
            }
        }
    }
}
