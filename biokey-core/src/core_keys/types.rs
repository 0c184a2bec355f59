//! Data model for biometric key derivation
//!
//! `DerivationParams` is the ephemeral input of a single derivation call and
//! `DerivedKey` its output. Neither is ever persisted by this crate.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// BIP44 coin type registered for Solana
pub const SOLANA_COIN_TYPE: u32 = 501;

/// Milliseconds since the Unix epoch
pub fn unix_millis_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Biometric modality reported by the capture layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BiometricType {
    #[default]
    Finger,
    Face,
    Unknown,
}

impl BiometricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiometricType::Finger => "finger",
            BiometricType::Face => "face",
            BiometricType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BiometricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BiometricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "finger" | "fingerprint" => Ok(BiometricType::Finger),
            "face" => Ok(BiometricType::Face),
            "unknown" => Ok(BiometricType::Unknown),
            other => Err(format!("Unknown biometric type: {}", other)),
        }
    }
}

/// Hardened BIP44-style label attached to keys from `derive_multiple_keys`.
///
/// This is metadata only: keys are not produced by hierarchical derivation,
/// the index is mixed into the salt instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DerivationPath {
    coin_type: u32,
    index: u32,
}

impl DerivationPath {
    pub fn new(coin_type: u32, index: u32) -> Self {
        Self { coin_type, index }
    }

    /// Solana path `m/44'/501'/<index>'`
    pub fn solana(index: u32) -> Self {
        Self::new(SOLANA_COIN_TYPE, index)
    }

    pub fn coin_type(&self) -> u32 {
        self.coin_type
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m/44'/{}'/{}'", self.coin_type, self.index)
    }
}

impl FromStr for DerivationPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 4 || parts[0] != "m" || parts[1] != "44'" {
            return Err(format!("Unsupported derivation path: {}", s));
        }

        let hardened = |part: &str| -> Result<u32, String> {
            part.strip_suffix('\'')
                .ok_or_else(|| format!("Path segment must be hardened: {}", part))?
                .parse::<u32>()
                .map_err(|e| format!("Invalid path segment '{}': {}", part, e))
        };

        Ok(DerivationPath::new(hardened(parts[2])?, hardened(parts[3])?))
    }
}

impl From<DerivationPath> for String {
    fn from(path: DerivationPath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for DerivationPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Input to a single derivation call
#[derive(Debug, Clone)]
pub struct DerivationParams {
    biometric_token: SecretString,
    pub device_id: String,
    pub user_id: i64,
    /// Overrides the deterministic per-(device, user) salt
    pub salt: Option<String>,
    /// Modality reported by the capture layer; `Finger` when absent
    pub biometric_type: Option<BiometricType>,
}

impl DerivationParams {
    pub fn new(biometric_token: impl Into<String>, device_id: impl Into<String>, user_id: i64) -> Self {
        Self {
            biometric_token: SecretString::new(biometric_token.into()),
            device_id: device_id.into(),
            user_id,
            salt: None,
            biometric_type: None,
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn with_biometric_type(mut self, biometric_type: BiometricType) -> Self {
        self.biometric_type = Some(biometric_type);
        self
    }

    /// Same identifiers, different token
    pub fn with_token(&self, biometric_token: impl Into<String>) -> Self {
        Self {
            biometric_token: SecretString::new(biometric_token.into()),
            ..self.clone()
        }
    }

    pub(crate) fn biometric_token(&self) -> &str {
        self.biometric_token.expose_secret()
    }
}

/// Keypair produced by a derivation call
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedKey {
    /// base58 of the 32-byte Ed25519 public key
    pub public_key: String,
    /// base58 of the 64-byte secret key (seed || public key)
    pub private_key: String,
    pub device_id: String,
    pub biometric_type: BiometricType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<DerivationPath>,
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("device_id", &self.device_id)
            .field("biometric_type", &self.biometric_type)
            .field("derivation_path", &self.derivation_path)
            .finish()
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}
