//! Durable credential storage backends.

use crate::{Credential, SessionError, SessionResult};
use std::path::PathBuf;
use std::sync::Mutex;

/// Trait for durable credential storage.
///
/// The store writes at most one credential; backends only need a single
/// slot. Implementations must be safe to call from multiple tasks.
pub trait TokenStorage: Send + Sync {
    /// Load the persisted credential, if any.
    fn load(&self) -> SessionResult<Option<Credential>>;

    /// Persist the credential, replacing any previous one.
    fn store(&self, credential: &Credential) -> SessionResult<()>;

    /// Remove the persisted credential. Returns whether one was present.
    fn clear(&self) -> SessionResult<bool>;
}

/// File-backed credential storage (a JSON file under the client base
/// directory).
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Create a storage backend writing to the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> SessionResult<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let credential = serde_json::from_str(&content)?;
        Ok(Some(credential))
    }

    fn store(&self, credential: &Credential) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(credential)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn clear(&self) -> SessionResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)?;
        Ok(true)
    }
}

/// In-memory credential storage. Used in tests and as the degraded mode
/// when the base directory is not writable.
pub struct MemoryTokenStorage {
    slot: Mutex<Option<Credential>>,
}

impl MemoryTokenStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl Default for MemoryTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> SessionResult<Option<Credential>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| SessionError::Storage("lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn store(&self, credential: &Credential) -> SessionResult<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SessionError::Storage("lock poisoned".to_string()))?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> SessionResult<bool> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SessionError::Storage("lock poisoned".to_string()))?;
        Ok(slot.take().is_some())
    }
}
