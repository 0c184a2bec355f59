//! Keypair codec
//!
//! Maps a 32-byte seed onto an Ed25519 keypair using the layout expected by
//! Solana wallet tooling: the public key is the raw 32-byte verifying key and
//! the secret key is the 64-byte `seed || public` concatenation. Both travel
//! as base58 text.
//!
//! Security: the signing key is zeroized on drop by ed25519-dalek.

use super::error::KeyDerivationError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use std::fmt;
use zeroize::Zeroizing;

/// Encode raw bytes as base58 (Bitcoin alphabet)
pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode base58 text into raw bytes
pub fn decode_base58(s: &str) -> Result<Vec<u8>, KeyDerivationError> {
    bs58::decode(s)
        .into_vec()
        .map_err(|e| KeyDerivationError::InvalidKey(format!("Invalid base58: {}", e)))
}

/// Ed25519 keypair in Solana's encoding
#[derive(Clone)]
pub struct SolanaKeypair {
    signing_key: SigningKey,
}

impl SolanaKeypair {
    /// Expand a 32-byte seed into a full keypair
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        SolanaKeypair {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a base58 64-byte secret key.
    ///
    /// The public half must match the public key expanded from the seed half.
    pub fn from_base58_secret(secret: &str) -> Result<Self, KeyDerivationError> {
        let bytes = Zeroizing::new(decode_base58(secret)?);
        let keypair_bytes: &[u8; KEYPAIR_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            KeyDerivationError::InvalidKey(format!(
                "Secret key must be {} bytes, got {}",
                KEYPAIR_LENGTH,
                bytes.len()
            ))
        })?;

        let signing_key = SigningKey::from_keypair_bytes(keypair_bytes)
            .map_err(|e| KeyDerivationError::InvalidKey(format!("Mismatched keypair: {}", e)))?;

        Ok(SolanaKeypair { signing_key })
    }

    /// Raw 32-byte public key
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Raw 64-byte secret key (seed || public)
    pub fn to_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LENGTH]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn public_key_base58(&self) -> String {
        encode_base58(&self.public_key())
    }

    pub fn secret_key_base58(&self) -> String {
        let bytes = self.to_bytes();
        encode_base58(&bytes[..])
    }

    /// Sign a message, returning the 64-byte signature
    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        self.signing_key.sign(msg).to_bytes()
    }

    /// Verify a signature against a base58 public key
    pub fn verify(public_key: &str, msg: &[u8], sig: &[u8]) -> bool {
        let pubkey = match decode_base58(public_key) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let pubkey: &[u8; PUBLIC_KEY_LENGTH] = match pubkey.as_slice().try_into() {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let verifying_key = match VerifyingKey::from_bytes(pubkey) {
            Ok(vk) => vk,
            Err(_) => return false,
        };

        let signature = match Signature::from_slice(sig) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        verifying_key.verify(msg, &signature).is_ok()
    }
}

impl fmt::Debug for SolanaKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaKeypair")
            .field("public", &self.public_key_base58())
            .field("secret", &"<redacted>")
            .finish()
    }
}
