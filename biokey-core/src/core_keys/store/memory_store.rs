//! In-memory session store

use super::{sort_sessions, SessionStore, StoreError};
use crate::core_keys::session::BiometricSession;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

fn handle_poison<T>(_err: PoisonError<T>) -> StoreError {
    StoreError::Other("Lock poisoned: a thread panicked while holding the lock".to_string())
}

/// Non-persistent store, cheap to clone and share
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<(i64, String), BiometricSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &BiometricSession) -> Result<(), StoreError> {
        self.sessions
            .write()
            .map_err(handle_poison)?
            .insert((session.user_id, session.device_id.clone()), session.without_token());
        Ok(())
    }

    fn load(&self, user_id: i64, device_id: &str) -> Result<BiometricSession, StoreError> {
        self.sessions
            .read()
            .map_err(handle_poison)?
            .get(&(user_id, device_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(user_id, device_id))
    }

    fn remove(&self, user_id: i64, device_id: &str) -> Result<(), StoreError> {
        self.sessions
            .write()
            .map_err(handle_poison)?
            .remove(&(user_id, device_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(user_id, device_id))
    }

    fn list(&self) -> Result<Vec<BiometricSession>, StoreError> {
        let mut sessions: Vec<_> = self.sessions.read().map_err(handle_poison)?.values().cloned().collect();
        sort_sessions(&mut sessions);
        Ok(sessions)
    }
}
