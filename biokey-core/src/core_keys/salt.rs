//! Deterministic salts
//!
//! The salt is public: it only namespaces derivations per (device, user) and
//! defeats precomputed tables. It never depends on the biometric token.

use sha2::{Digest, Sha256};

/// `hex(SHA256(prefix || device_id || "_" || user_id))`
pub fn deterministic_salt(prefix: &str, device_id: &str, user_id: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}{}_{}", prefix, device_id, user_id).as_bytes());
    hex::encode(hasher.finalize())
}

/// Salt for the `index`-th key of a multi-key derivation
pub fn indexed_salt(base_salt: &str, index: u32) -> String {
    format!("{}_{}", base_salt, index)
}

/// True for a 64-character lowercase hex string (a SHA-256 digest)
pub fn is_digest_hex(salt: &str) -> bool {
    salt.len() == 64 && salt.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
