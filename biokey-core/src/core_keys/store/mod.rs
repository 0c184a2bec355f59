//! Session store
//!
//! Persists the public part of [`BiometricSession`]s, keyed by
//! `(user_id, device_id)`. Tokens and private keys are never stored.

use super::session::BiometricSession;
use thiserror::Error;

pub mod file_store;
pub mod memory_store;

pub use file_store::FileSessionStore;
pub use memory_store::MemorySessionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: user {user_id} on device {device_id}")]
    NotFound { user_id: i64, device_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl StoreError {
    pub(crate) fn not_found(user_id: i64, device_id: &str) -> Self {
        StoreError::NotFound {
            user_id,
            device_id: device_id.to_string(),
        }
    }
}

pub trait SessionStore: Send + Sync {
    /// Insert or replace the session for its `(user_id, device_id)`
    fn save(&self, session: &BiometricSession) -> Result<(), StoreError>;

    fn load(&self, user_id: i64, device_id: &str) -> Result<BiometricSession, StoreError>;

    fn remove(&self, user_id: i64, device_id: &str) -> Result<(), StoreError>;

    /// All stored sessions, ordered by user id then device id
    fn list(&self) -> Result<Vec<BiometricSession>, StoreError>;

    /// Bump `last_used` on the stored session and return it
    fn touch(&self, user_id: i64, device_id: &str) -> Result<BiometricSession, StoreError> {
        let mut session = self.load(user_id, device_id)?;
        session.touch();
        self.save(&session)?;
        Ok(session)
    }
}

pub(crate) fn sort_sessions(sessions: &mut [BiometricSession]) {
    sessions.sort_by(|a, b| (a.user_id, &a.device_id).cmp(&(b.user_id, &b.device_id)));
}
