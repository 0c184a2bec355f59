//! Deterministic biometric key derivation for Solana wallets
//!
//! A biometric token from the device's secure enclave, together with the
//! device and user identifiers, is stretched with PBKDF2 into an Ed25519
//! seed. The same inputs always yield the same keypair, so nothing secret has
//! to be stored: a backup only records how to rebuild the salt.
//!
//! ```no_run
//! use biokey_core::core_keys::{DerivationParams, KeyDerivationEngine};
//!
//! let engine = KeyDerivationEngine::default();
//! let key = engine.derive_private_key(&DerivationParams::new("token", "device-1", 42))?;
//! println!("{}", key.public_key);
//! # Ok::<(), biokey_core::core_keys::KeyDerivationError>(())
//! ```

pub mod config;
pub mod core_keys;
pub mod logging;
pub mod metrics;

pub use config::{Config, DerivationConfig};
pub use core_keys::{DerivationParams, DerivedKey, KeyDerivationEngine, KeyDerivationError};
pub use logging::{init_logging, LogLevel};
