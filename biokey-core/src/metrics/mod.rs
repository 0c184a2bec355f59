//! Metrics for key derivation
//!
//! Emits through the `metrics` facade; installing a recorder is up to the
//! host application. Without one every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const DERIVATIONS_TOTAL: &str = "biokey.derivations.total";
pub const DERIVATIONS_FAILED: &str = "biokey.derivations.failed";
pub const DERIVATION_DURATION_MS: &str = "biokey.derivation.duration_ms";
pub const VALIDATIONS_MISMATCH: &str = "biokey.validations.mismatch";
pub const BACKUPS_CREATED: &str = "biokey.backups.created";
pub const BACKUPS_RESTORED: &str = "biokey.backups.restored";
pub const BACKUPS_REJECTED: &str = "biokey.backups.rejected";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(DERIVATIONS_TOTAL, "Number of successful key derivations");
    describe_counter!(DERIVATIONS_FAILED, "Number of derivations rejected for invalid input");
    describe_histogram!(DERIVATION_DURATION_MS, "PBKDF2 + Ed25519 derivation time in milliseconds");
    describe_counter!(VALIDATIONS_MISMATCH, "Biometric tokens that did not reproduce the expected key");
    describe_counter!(BACKUPS_CREATED, "Number of key backups created");
    describe_counter!(BACKUPS_RESTORED, "Number of key backups restored");
    describe_counter!(BACKUPS_REJECTED, "Number of malformed backups rejected");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer, record the duration and return it
    pub fn stop(self) -> std::time::Duration {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
        duration
    }
}
