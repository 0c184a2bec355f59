//! File-based session store
//!
//! One JSON document per `(user_id, device_id)`:
//!
//! ```text
//! <dir>/session-<first 16 bytes of sha256("<user_id>:<device_id>") as hex>.json
//! ```
//!
//! Files only hold what `BiometricSession` serializes, so the token never
//! reaches disk.

use super::{sort_sessions, SessionStore, StoreError};
use crate::core_keys::session::BiometricSession;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

const FILE_PREFIX: &str = "session-";
const FILE_SUFFIX: &str = ".json";

/// Distinguishes temp files of concurrent writers within one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Open a store rooted at `base_path`, creating the directory if needed
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(FileSessionStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn session_path(&self, user_id: i64, device_id: &str) -> PathBuf {
        let digest = Sha256::digest(format!("{}:{}", user_id, device_id).as_bytes());
        self.base_path
            .join(format!("{}{}{}", FILE_PREFIX, hex::encode(&digest[..16]), FILE_SUFFIX))
    }

    /// Write to a writer-private temp file, then rename over the target
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));

        if let Err(e) = fs::write(&temp_path, data).and_then(|_| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn read_session(path: &Path) -> Result<BiometricSession, StoreError> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &BiometricSession) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(session).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let path = self.session_path(session.user_id, &session.device_id);
        self.write_atomic(&path, &json)?;
        debug!(user_id = session.user_id, path = %path.display(), "Saved session");
        Ok(())
    }

    fn load(&self, user_id: i64, device_id: &str) -> Result<BiometricSession, StoreError> {
        let path = self.session_path(user_id, device_id);
        match Self::read_session(&path) {
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::not_found(user_id, device_id))
            }
            other => other,
        }
    }

    fn remove(&self, user_id: i64, device_id: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.session_path(user_id, device_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(user_id, device_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<BiometricSession>, StoreError> {
        let mut sessions = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let filename = entry.file_name();
            let filename_str = filename.to_string_lossy();

            if !(filename_str.starts_with(FILE_PREFIX) && filename_str.ends_with(FILE_SUFFIX)) {
                continue;
            }

            match Self::read_session(&entry.path()) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(file = %filename_str, error = %e, "Skipping unreadable session file"),
            }
        }

        sort_sessions(&mut sessions);
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_keys::tests::helpers::fast_engine;
    use crate::core_keys::BiometricType;
    use tempfile::TempDir;

    fn session(user_id: i64, device_id: &str) -> BiometricSession {
        fast_engine()
            .create_biometric_session(user_id, device_id, "abc123", BiometricType::Face)
            .unwrap()
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path()).unwrap();

        let original = session(42, "device-1");
        store.save(&original).unwrap();

        let loaded = store.load(42, "device-1").unwrap();
        assert_eq!(loaded.public_key, original.public_key);
        assert_eq!(loaded.biometric_type, BiometricType::Face);
        assert_eq!(loaded.key_backup, original.key_backup);
        assert!(!loaded.has_token());
    }

    #[test]
    fn test_file_store_never_writes_token() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path()).unwrap();
        store.save(&session(42, "device-1")).unwrap();

        let path = store.session_path(42, "device-1");
        let contents = fs::read_to_string(path).unwrap();
        assert!(!contents.contains("abc123"));
        assert!(contents.contains("\"publicKey\""));
    }

    #[test]
    fn test_file_store_missing_session() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path()).unwrap();

        assert!(matches!(store.load(1, "nope"), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.remove(1, "nope"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_file_store_list_skips_foreign_and_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path()).unwrap();
        store.save(&session(2, "b")).unwrap();
        store.save(&session(1, "a")).unwrap();

        fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(temp_dir.path().join("session-broken.json"), "{not json").unwrap();

        let listed: Vec<_> = store.list().unwrap().into_iter().map(|s| s.user_id).collect();
        assert_eq!(listed, vec![1, 2]);
    }

    #[test]
    fn test_file_store_touch_persists() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path()).unwrap();
        let original = session(7, "d");
        store.save(&original).unwrap();

        let touched = store.touch(7, "d").unwrap();
        assert!(touched.last_used >= original.last_used);
        assert_eq!(store.load(7, "d").unwrap().last_used, touched.last_used);
    }

    #[test]
    fn test_file_store_concurrent_saves_of_one_session() {
        let temp_dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(FileSessionStore::new(temp_dir.path()).unwrap());
        let original = session(9, "shared");
        store.save(&original).unwrap();

        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                let mut copy = original.clone();
                let base = original.last_used;
                std::thread::spawn(move || {
                    for j in 0..20u64 {
                        copy.last_used = base + i * 100 + j;
                        store.save(&copy).unwrap();
                        store.touch(9, "shared").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = store.load(9, "shared").unwrap();
        assert_eq!(loaded.public_key, original.public_key);

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
    }

    #[test]
    fn test_file_store_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let store = FileSessionStore::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.base_path(), nested.as_path());
    }
}
