//! Key derivation engine
//!
//! `(biometric_token, device_id, user_id) -> salt -> PBKDF2 seed -> Ed25519 keypair`
//!
//! Every operation is a pure function of its inputs and the engine's
//! configuration. The engine holds no mutable state and can be shared freely
//! across threads. PBKDF2 is deliberately slow (100k rounds by default);
//! async callers should go through [`KeyDerivationEngine::derive_in_background`].

use super::error::KeyDerivationError;
use super::keypair::SolanaKeypair;
use super::salt::{deterministic_salt, indexed_salt};
use super::types::{DerivationParams, DerivationPath, DerivedKey};
use crate::config::{DerivationConfig, UserIdPolicy};
use crate::metrics::{self, Timer};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Length of the stretched seed fed into Ed25519
pub const SEED_LENGTH: usize = 32;

/// Deterministic biometric key derivation
#[derive(Debug, Clone, Default)]
pub struct KeyDerivationEngine {
    config: Arc<DerivationConfig>,
}

impl KeyDerivationEngine {
    pub fn new(config: DerivationConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DerivationConfig {
        &self.config
    }

    /// Deterministic salt for a (device, user) pair under this engine's prefix
    pub fn deterministic_salt(&self, device_id: &str, user_id: i64) -> String {
        deterministic_salt(&self.config.salt_prefix, device_id, user_id)
    }

    /// Reject identifiers this engine will not derive for
    pub(crate) fn check_identifiers(&self, device_id: &str, user_id: i64) -> Result<(), KeyDerivationError> {
        if device_id.is_empty() {
            return Err(KeyDerivationError::invalid_input("device id must not be empty"));
        }

        if self.config.user_id_policy == UserIdPolicy::Positive && user_id <= 0 {
            return Err(KeyDerivationError::InvalidInput(format!(
                "user id must be positive, got {}",
                user_id
            )));
        }

        Ok(())
    }

    fn check_params(&self, params: &DerivationParams) -> Result<(), KeyDerivationError> {
        if params.biometric_token().is_empty() {
            return Err(KeyDerivationError::invalid_input("biometric token must not be empty"));
        }
        self.check_identifiers(&params.device_id, params.user_id)
    }

    fn stretch(&self, token: &str, salt: &str) -> Zeroizing<[u8; SEED_LENGTH]> {
        let mut seed = Zeroizing::new([0u8; SEED_LENGTH]);
        pbkdf2_hmac::<Sha256>(token.as_bytes(), salt.as_bytes(), self.config.iterations, &mut seed[..]);
        seed
    }

    /// Derive a keypair from a biometric token.
    ///
    /// An empty salt override counts as no override. `biometric_type`
    /// falls back to `Finger` when the caller did not supply one.
    pub fn derive_private_key(&self, params: &DerivationParams) -> Result<DerivedKey, KeyDerivationError> {
        if let Err(e) = self.check_params(params) {
            metrics::record_counter(metrics::DERIVATIONS_FAILED, 1);
            return Err(e);
        }

        let timer = Timer::new(metrics::DERIVATION_DURATION_MS);

        let salt = match params.salt.as_deref() {
            Some(salt) if !salt.is_empty() => salt.to_string(),
            _ => self.deterministic_salt(&params.device_id, params.user_id),
        };

        let seed = self.stretch(params.biometric_token(), &salt);
        let keypair = SolanaKeypair::from_seed(&seed);

        let key = DerivedKey {
            public_key: keypair.public_key_base58(),
            private_key: keypair.secret_key_base58(),
            device_id: params.device_id.clone(),
            biometric_type: params.biometric_type.unwrap_or_default(),
            derivation_path: None,
        };

        let elapsed = timer.stop();
        if elapsed > self.config.slow_derivation_threshold {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                iterations = self.config.iterations,
                "Slow key derivation; run it off the request path"
            );
        }
        metrics::record_counter(metrics::DERIVATIONS_TOTAL, 1);
        debug!(
            device_id = %key.device_id,
            public_key = %key.public_key,
            "Derived biometric key"
        );

        Ok(key)
    }

    /// Derive `key_count` independent keys, one per salt index.
    ///
    /// Key `i` uses salt `deterministic_salt + "_" + i` and is labelled
    /// `m/44'/<coin>'/i'`. Any salt override in `params` is ignored.
    pub fn derive_multiple_keys(
        &self,
        params: &DerivationParams,
        key_count: u32,
    ) -> Result<Vec<DerivedKey>, KeyDerivationError> {
        let base_salt = self.deterministic_salt(&params.device_id, params.user_id);

        (0..key_count)
            .map(|index| -> Result<DerivedKey, KeyDerivationError> {
                let mut indexed = params.clone();
                indexed.salt = Some(indexed_salt(&base_salt, index));

                let mut key = self.derive_private_key(&indexed)?;
                key.derivation_path = Some(DerivationPath::new(self.config.coin_type, index));
                Ok(key)
            })
            .collect()
    }

    /// `derive_multiple_keys` with the configured default count
    pub fn derive_default_keys(&self, params: &DerivationParams) -> Result<Vec<DerivedKey>, KeyDerivationError> {
        self.derive_multiple_keys(params, self.config.default_key_count)
    }

    /// True when `params` reproduce `expected_public_key`. Never fails.
    pub fn validate_biometric_key(&self, params: &DerivationParams, expected_public_key: &str) -> bool {
        match self.derive_private_key(params) {
            Ok(key) if key.public_key == expected_public_key => true,
            Ok(_) => {
                metrics::record_counter(metrics::VALIDATIONS_MISMATCH, 1);
                debug!(device_id = %params.device_id, "Biometric key mismatch");
                false
            }
            Err(e) => {
                warn!(error = %e, "Key validation failed");
                false
            }
        }
    }

    /// Run `derive_private_key` on tokio's blocking pool
    pub async fn derive_in_background(&self, params: DerivationParams) -> Result<DerivedKey, KeyDerivationError> {
        let engine = self.clone();
        match tokio::task::spawn_blocking(move || engine.derive_private_key(&params)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(KeyDerivationError::Interrupted(e.to_string())),
        }
    }
}
