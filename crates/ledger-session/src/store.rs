//! The session store: single owner of the credential.

use crate::{Credential, MemoryTokenStorage, TokenStorage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Broadcast payload fired when the credential transitions to absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnded {
    /// The session epoch after the transition. Work started under an older
    /// epoch must discard its results.
    pub epoch: u64,
}

/// Holds the current credential and announces session end.
///
/// At most one credential is active at a time. `clear_credential` fires the
/// [`SessionEnded`] broadcast only on a present-to-absent transition, so
/// any number of concurrent authorization failures collapse into a single
/// announcement.
pub struct SessionStore {
    storage: Box<dyn TokenStorage>,
    credential: RwLock<Option<Credential>>,
    epoch: AtomicU64,
    ended_tx: broadcast::Sender<SessionEnded>,
}

impl SessionStore {
    /// Create a store over the given storage backend, restoring a persisted
    /// credential if one exists.
    ///
    /// A failing backend degrades to an empty in-memory session rather than
    /// failing construction.
    pub fn new(storage: Box<dyn TokenStorage>) -> Self {
        let restored = match storage.load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore persisted credential");
                None
            }
        };

        if restored.is_some() {
            tracing::debug!("Restored persisted session credential");
        }

        let (ended_tx, _) = broadcast::channel(16);

        Self {
            storage,
            credential: RwLock::new(restored),
            epoch: AtomicU64::new(0),
            ended_tx,
        }
    }

    /// Create a store with in-memory storage (tests, degraded mode).
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryTokenStorage::new()))
    }

    /// Subscribe to session-ended broadcasts.
    pub fn subscribe_ended(&self) -> broadcast::Receiver<SessionEnded> {
        self.ended_tx.subscribe()
    }

    /// Get a copy of the current credential, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.credential.read().expect("lock poisoned").clone()
    }

    /// Whether a credential is currently present.
    pub fn is_authenticated(&self) -> bool {
        self.credential.read().expect("lock poisoned").is_some()
    }

    /// The current session epoch. Bumped on every credential clear.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Install a new credential (login).
    pub fn set_credential(&self, credential: Credential) {
        {
            let mut slot = self.credential.write().expect("lock poisoned");
            *slot = Some(credential.clone());
        }

        if let Err(e) = self.storage.store(&credential) {
            tracing::warn!(error = %e, "Failed to persist credential; continuing in memory");
        }

        tracing::info!("Session credential installed");
    }

    /// Clear the credential (logout or forced invalidation).
    ///
    /// Returns whether a credential was actually present. The broadcast and
    /// the epoch bump happen only in that case; clearing an already-absent
    /// credential is a no-op.
    pub fn clear_credential(&self) -> bool {
        let was_present = {
            let mut slot = self.credential.write().expect("lock poisoned");
            slot.take().is_some()
        };

        if !was_present {
            return false;
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        if let Err(e) = self.storage.clear() {
            tracing::warn!(error = %e, "Failed to clear persisted credential");
        }

        tracing::info!(epoch, "Session ended");
        let _ = self.ended_tx.send(SessionEnded { epoch });

        true
    }
}
