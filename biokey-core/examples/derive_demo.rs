//! Walk through enrollment, unlock and backup with an in-memory sensor
//!
//! Run with:
//! ```bash
//! cargo run --example derive_demo
//! ```

use biokey_core::core_keys::{enroll, unlock, BiometricType, KeyDerivationEngine, MemoryCapture};
use biokey_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use tracing::{error, info};

fn main() {
    let config = LogConfig::new(LogLevel::Debug).with_target(false);
    init_logging_with_config(config).expect("Failed to initialize logging");

    let engine = KeyDerivationEngine::default();
    let capture = MemoryCapture::new("demo-device", "demo-token").with_biometric_type(BiometricType::Face);

    let session = match enroll(&engine, &capture, 42) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Enrollment failed");
            return;
        }
    };
    info!(public_key = %session.public_key, "Enrolled");

    match unlock(&engine, &capture, &session) {
        Ok(Some(_)) => info!("Unlocked with the enrolled finger"),
        Ok(None) => info!("Token did not match"),
        Err(e) => error!(error = %e, "Unlock failed"),
    }

    // Re-enrollment on the device changes the token
    capture.set_token("new-token");
    let outcome = unlock(&engine, &capture, &session).expect("session is enabled");
    info!(matched = outcome.is_some(), "Unlock after re-enrollment");

    if let Some(Ok(restored)) = session.restore_params(&engine) {
        let key = engine
            .derive_private_key(&restored.into_params("demo-token"))
            .expect("restored params are valid");
        info!(matches_session = key.public_key == session.public_key, "Restored from backup");
    }
}
