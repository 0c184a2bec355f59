//! Test helpers and fixtures

use crate::config::DerivationConfig;
use crate::core_keys::{DerivationParams, KeyDerivationEngine};

/// Engine with a low iteration count so tests stay fast.
///
/// Keys from this engine differ from production keys.
pub fn fast_engine() -> KeyDerivationEngine {
    KeyDerivationEngine::new(DerivationConfig {
        iterations: 1_000,
        ..DerivationConfig::default()
    })
}

/// `("abc123", "device-1", 42)`
pub fn sample_params() -> DerivationParams {
    DerivationParams::new("abc123", "device-1", 42)
}
