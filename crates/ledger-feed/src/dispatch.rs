//! Typed event dispatch table.

use ledger_protocol_types::{DomainEvent, EventKind};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Identifies a registered handler so it can be unregistered.
pub type HandlerId = u64;

type Handler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Maps event kinds to ordered handler lists.
///
/// Handlers for a kind run in registration order. A panicking handler is
/// caught and logged; later handlers for the same event, and all handlers
/// for later events, still run.
pub struct Dispatcher {
    handlers: RwLock<HashMap<EventKind, Vec<(HandlerId, Handler)>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for an event kind. Returns its id for `off`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut handlers = self.handlers.write().expect("lock poisoned");
        handlers
            .entry(kind)
            .or_insert_with(Vec::new)
            .push((id, Arc::new(handler)));
        id
    }

    /// Unregister a handler. Returns whether it was found.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().expect("lock poisoned");
        if let Some(list) = handlers.get_mut(&kind) {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            return list.len() < before;
        }
        false
    }

    /// Deliver an event to every handler registered for its kind.
    pub fn dispatch(&self, event: &DomainEvent) {
        // Snapshot outside the lock so handlers may call on/off.
        let snapshot: Vec<(HandlerId, Handler)> = {
            let handlers = self.handlers.read().expect("lock poisoned");
            match handlers.get(&event.kind) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for (id, handler) in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| handler(event)));
            if result.is_err() {
                tracing::error!(kind = ?event.kind, handler = id, "Event handler panicked");
            }
        }
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        let handlers = self.handlers.read().expect("lock poisoned");
        handlers.get(&kind).map(|list| list.len()).unwrap_or(0)
    }

    /// Remove every handler for every kind.
    pub fn clear(&self) {
        self.handlers.write().expect("lock poisoned").clear();
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
