//! Cache change notifications.
//!
//! Consumers subscribe per logical query name and re-render from cache
//! state when notified. Notifications are emitted after the cache mutation
//! is visible.

use crate::QueryKey;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::RwLock;

/// Why a cache entry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// A fetch committed a new value.
    Committed,
    /// A pushed snapshot overwrote the value directly.
    DirectWrite,
    /// The entry was marked stale; a refetch is scheduled.
    Invalidated,
    /// The entry was removed (session ended).
    Cleared,
}

/// A change notification for one cache entry.
#[derive(Debug, Clone)]
pub struct CacheChange {
    pub key: QueryKey,
    pub revision: u64,
    pub reason: ChangeReason,
}

/// A subscription to changes for one logical query name.
pub struct ChangeSubscription {
    receiver: Receiver<CacheChange>,
}

impl ChangeSubscription {
    fn new(receiver: Receiver<CacheChange>) -> Self {
        Self { receiver }
    }

    /// Block until the next change arrives. Returns None once the
    /// subscription is closed.
    pub fn recv(&self) -> Option<CacheChange> {
        self.receiver.recv().ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<CacheChange> {
        self.receiver.try_recv().ok()
    }

    /// Blocking iterator over incoming changes.
    pub fn iter(&self) -> impl Iterator<Item = CacheChange> + '_ {
        std::iter::from_fn(|| self.recv())
    }
}

/// A hub that manages change subscriptions keyed by logical query name.
#[derive(Debug)]
pub struct ChangeHub {
    subscribers: RwLock<HashMap<String, Vec<Sender<CacheChange>>>>,
}

impl ChangeHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to changes for a logical query name.
    pub fn subscribe(&self, name: &str) -> ChangeSubscription {
        let (sender, receiver) = mpsc::channel();

        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        subscribers
            .entry(name.to_string())
            .or_insert_with(Vec::new)
            .push(sender);

        ChangeSubscription::new(receiver)
    }

    /// Notify subscribers of a change. Dead subscribers are removed.
    pub fn notify(&self, change: CacheChange) {
        let mut subscribers = self.subscribers.write().expect("lock poisoned");

        if let Some(senders) = subscribers.get_mut(&change.key.name) {
            senders.retain(|sender| sender.send(change.clone()).is_ok());
        }
    }

    /// Number of live subscribers for a name (may count dead ones until the
    /// next notify).
    pub fn subscriber_count(&self, name: &str) -> usize {
        let subscribers = self.subscribers.read().expect("lock poisoned");
        subscribers.get(name).map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}
