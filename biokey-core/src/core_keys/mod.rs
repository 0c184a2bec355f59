//! Biometric key derivation
//!
//! API that we expose:
//! - `KeyDerivationEngine::derive_private_key()` -> one Ed25519 keypair from a biometric token
//! - `KeyDerivationEngine::derive_multiple_keys()` -> N keypairs labelled `m/44'/501'/i'`
//! - `KeyDerivationEngine::validate_biometric_key()` -> does a token reproduce a public key
//! - `KeyDerivationEngine::create_key_backup()` / `restore_from_backup()` -> salt inputs as base64 JSON
//! - `KeyDerivationEngine::create_biometric_session()` / `recreate_private_key()` -> session helpers
//! - `enroll()` / `unlock()` -> drive a [`BiometricCapture`] layer end to end
//! - `SessionStore` -> persist public session records

mod backup;
mod capture;
mod engine;
mod error;
mod keypair;
mod salt;
mod session;
pub mod store;
mod types;

pub use backup::{KeyBackup, RestoredParams, BACKUP_VERSION};
pub use capture::{
    capture_payload, enroll, forget, unlock, BiometricCapabilities, BiometricCapture, BiometricData, BiometricStatus,
    CaptureOutcome, EnrollmentError, MemoryCapture,
};
pub use engine::{KeyDerivationEngine, SEED_LENGTH};
pub use error::KeyDerivationError;
pub use keypair::{decode_base58, encode_base58, SolanaKeypair};
pub use salt::{deterministic_salt, indexed_salt};
pub use session::BiometricSession;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError};
pub use types::{unix_millis_now, BiometricType, DerivationParams, DerivationPath, DerivedKey, SOLANA_COIN_TYPE};

#[cfg(test)]
pub(crate) mod tests;
