//! Biometric capture capability
//!
//! The engine never talks to sensors itself. A platform layer implements
//! [`BiometricCapture`] and hands over opaque tokens; `enroll` and `unlock`
//! drive that layer and feed its output into the engine.

use super::engine::KeyDerivationEngine;
use super::error::KeyDerivationError;
use super::session::BiometricSession;
use super::store::{SessionStore, StoreError};
use super::types::{unix_millis_now, BiometricType, DerivationParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Readiness of the capture layer, derived from [`BiometricCapabilities`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricStatus {
    NotInitialized,
    NotAvailable,
    AccessRequired,
    /// A token is already saved on the device
    Configured,
    Ready,
    Error,
}

impl fmt::Display for BiometricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BiometricStatus::NotInitialized => "not_initialized",
            BiometricStatus::NotAvailable => "not_available",
            BiometricStatus::AccessRequired => "access_required",
            BiometricStatus::Configured => "configured",
            BiometricStatus::Ready => "ready",
            BiometricStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricCapabilities {
    pub is_inited: bool,
    /// Sensor initialization raised an error
    #[serde(default)]
    pub init_failed: bool,
    pub is_available: bool,
    pub biometric_type: Option<BiometricType>,
    pub is_access_requested: bool,
    pub is_access_granted: bool,
    pub is_token_saved: bool,
}

impl BiometricCapabilities {
    pub fn status(&self) -> BiometricStatus {
        if self.init_failed {
            BiometricStatus::Error
        } else if !self.is_inited {
            BiometricStatus::NotInitialized
        } else if !self.is_available {
            BiometricStatus::NotAvailable
        } else if !self.is_access_granted {
            BiometricStatus::AccessRequired
        } else if self.is_token_saved {
            BiometricStatus::Configured
        } else {
            BiometricStatus::Ready
        }
    }
}

/// Result of a single authentication prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub success: bool,
    pub token: Option<String>,
}

impl CaptureOutcome {
    pub fn granted(token: impl Into<String>) -> Self {
        Self {
            success: true,
            token: Some(token.into()),
        }
    }

    pub fn denied() -> Self {
        Self {
            success: false,
            token: None,
        }
    }
}

/// Platform biometric layer
pub trait BiometricCapture: Send + Sync {
    fn capabilities(&self) -> BiometricCapabilities;

    /// Stable identifier of the device the sensor lives on
    fn device_id(&self) -> String;

    fn request_access(&self, reason: &str) -> bool;

    fn authenticate(&self, reason: &str) -> CaptureOutcome;

    /// Persist `token` in the device's secure storage
    fn store_token(&self, token: &str) -> bool;

    /// Clear the token from the device's secure storage
    fn remove_token(&self) -> bool;
}

/// Payload handed over by a capture layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricData {
    pub token: String,
    pub device_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometric_type: Option<BiometricType>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: u64,
}

impl BiometricData {
    /// Turn a successful capture into derivation params for `user_id`
    pub fn into_params(self, user_id: i64) -> Result<DerivationParams, KeyDerivationError> {
        if !self.success {
            return Err(KeyDerivationError::invalid_input("biometric capture did not succeed"));
        }

        let params = DerivationParams::new(self.token, self.device_id, user_id);
        Ok(match self.biometric_type {
            Some(t) => params.with_biometric_type(t),
            None => params,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    #[error("Biometrics not available: {0}")]
    NotAvailable(BiometricStatus),

    #[error("Biometric access denied")]
    AccessDenied,

    #[error("Biometric authentication failed")]
    AuthenticationFailed,

    #[error("Biometric token could not be saved")]
    TokenNotSaved,

    #[error("Biometric session is disabled")]
    SessionDisabled,

    #[error(transparent)]
    Derivation(#[from] KeyDerivationError),
}

const ENROLL_REASON: &str = "Confirm your identity to create a wallet key";
const UNLOCK_REASON: &str = "Confirm your identity to unlock your wallet key";

fn authenticated_token(capture: &dyn BiometricCapture, reason: &str) -> Result<String, EnrollmentError> {
    match capture.authenticate(reason) {
        CaptureOutcome {
            success: true,
            token: Some(token),
        } if !token.is_empty() => Ok(token),
        _ => Err(EnrollmentError::AuthenticationFailed),
    }
}

/// Walk a capture layer through access, authentication and token storage,
/// then create a session for `user_id`.
pub fn enroll(
    engine: &KeyDerivationEngine,
    capture: &dyn BiometricCapture,
    user_id: i64,
) -> Result<BiometricSession, EnrollmentError> {
    let capabilities = capture.capabilities();
    match capabilities.status() {
        status @ (BiometricStatus::NotInitialized | BiometricStatus::NotAvailable | BiometricStatus::Error) => {
            warn!(user_id, %status, "Biometric enrollment unavailable");
            return Err(EnrollmentError::NotAvailable(status));
        }
        BiometricStatus::AccessRequired => {
            if !capture.request_access(ENROLL_REASON) {
                return Err(EnrollmentError::AccessDenied);
            }
        }
        BiometricStatus::Configured | BiometricStatus::Ready => {}
    }

    let token = authenticated_token(capture, ENROLL_REASON)?;
    if !capture.store_token(&token) {
        return Err(EnrollmentError::TokenNotSaved);
    }

    let device_id = capture.device_id();
    let biometric_type = capabilities.biometric_type.unwrap_or_default();
    let session = engine.create_biometric_session(user_id, &device_id, &token, biometric_type)?;

    info!(user_id, device_id = %device_id, "Biometric enrollment complete");
    Ok(session)
}

/// Authenticate again and recreate the session's private key.
///
/// `Ok(None)` means the sensor produced a token that does not match the
/// session, e.g. after re-enrollment on the device.
pub fn unlock(
    engine: &KeyDerivationEngine,
    capture: &dyn BiometricCapture,
    session: &BiometricSession,
) -> Result<Option<String>, EnrollmentError> {
    if !session.is_enabled {
        return Err(EnrollmentError::SessionDisabled);
    }

    let token = authenticated_token(capture, UNLOCK_REASON)?;
    let key = engine.recreate_private_key(session, &token);
    debug!(user_id = session.user_id, matched = key.is_some(), "Biometric unlock");
    Ok(key)
}

#[derive(Debug, Clone)]
struct CaptureState {
    capabilities: BiometricCapabilities,
    token: String,
    authentication_fails: bool,
    grant_access: bool,
    storage_works: bool,
}

/// In-process capture layer that always yields the same token
#[derive(Debug)]
pub struct MemoryCapture {
    device_id: String,
    state: RwLock<CaptureState>,
}

impl MemoryCapture {
    /// A ready sensor that grants access on request
    pub fn new(device_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            state: RwLock::new(CaptureState {
                capabilities: BiometricCapabilities {
                    is_inited: true,
                    is_available: true,
                    biometric_type: Some(BiometricType::Finger),
                    ..BiometricCapabilities::default()
                },
                token: token.into(),
                authentication_fails: false,
                grant_access: true,
                storage_works: true,
            }),
        }
    }

    pub fn with_biometric_type(self, biometric_type: BiometricType) -> Self {
        self.write_state().capabilities.biometric_type = Some(biometric_type);
        self
    }

    /// Sensor missing on the device
    pub fn unavailable(self) -> Self {
        self.write_state().capabilities.is_available = false;
        self
    }

    /// Access prompts get refused
    pub fn deny_access(self) -> Self {
        self.write_state().grant_access = false;
        self
    }

    pub fn fail_authentication(self) -> Self {
        self.write_state().authentication_fails = true;
        self
    }

    /// Sensor initialization errors out
    pub fn broken(self) -> Self {
        let mut state = self.write_state();
        state.capabilities.is_inited = false;
        state.capabilities.init_failed = true;
        drop(state);
        self
    }

    pub fn fail_storage(self) -> Self {
        self.write_state().storage_works = false;
        self
    }

    /// Simulate re-enrollment: the sensor now produces a different token
    pub fn set_token(&self, token: impl Into<String>) {
        self.write_state().token = token.into();
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CaptureState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CaptureState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BiometricCapture for MemoryCapture {
    fn capabilities(&self) -> BiometricCapabilities {
        self.read_state().capabilities
    }

    fn device_id(&self) -> String {
        self.device_id.clone()
    }

    fn request_access(&self, _reason: &str) -> bool {
        let mut state = self.write_state();
        state.capabilities.is_access_requested = true;
        state.capabilities.is_access_granted = state.grant_access;
        state.grant_access
    }

    fn authenticate(&self, _reason: &str) -> CaptureOutcome {
        let state = self.read_state();
        if state.authentication_fails || !state.capabilities.is_access_granted {
            CaptureOutcome::denied()
        } else {
            CaptureOutcome::granted(state.token.clone())
        }
    }

    fn store_token(&self, _token: &str) -> bool {
        let mut state = self.write_state();
        state.capabilities.is_token_saved = state.storage_works;
        state.storage_works
    }

    fn remove_token(&self) -> bool {
        let mut state = self.write_state();
        state.capabilities.is_token_saved = false;
        state.storage_works
    }
}

/// Reset biometrics for `user_id` on the capture's device: clear the
/// device token and delete the stored session.
pub fn forget(capture: &dyn BiometricCapture, store: &dyn SessionStore, user_id: i64) -> Result<(), StoreError> {
    let device_id = capture.device_id();
    if !capture.remove_token() {
        warn!(user_id, device_id = %device_id, "Biometric token could not be cleared");
    }
    store.remove(user_id, &device_id)?;
    info!(user_id, device_id = %device_id, "Biometric session forgotten");
    Ok(())
}

/// Build a capture payload the way a platform layer reports it
pub fn capture_payload(capture: &dyn BiometricCapture, reason: &str) -> BiometricData {
    let outcome = capture.authenticate(reason);
    BiometricData {
        token: outcome.token.unwrap_or_default(),
        device_id: capture.device_id(),
        success: outcome.success,
        biometric_type: capture.capabilities().biometric_type,
        timestamp: unix_millis_now(),
    }
}
