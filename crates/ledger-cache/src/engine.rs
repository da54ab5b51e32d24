//! The cache sync engine.

use crate::entry::{CacheEntry, CachedEntry};
use crate::mapping::{patterns_for, queries};
use crate::{
    CacheChange, CacheError, CacheResult, ChangeHub, ChangeReason, ChangeSubscription,
    FetchFailure, QueryFetcher, QueryKey, QueryPattern,
};
use ledger_feed::{FeedClient, HandlerId};
use ledger_protocol_types::{DomainEvent, EventKind};
use ledger_session::SessionStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;

type FetchOutcome = CacheResult<Value>;

struct Attachment {
    feed: Weak<FeedClient>,
    handlers: Vec<(EventKind, HandlerId)>,
}

/// Coordinates query caches, the event feed, and the session.
///
/// Cheap to clone; clones share all state. Cache entries are owned
/// exclusively by the engine; writes to one entry are totally ordered by
/// its revision counter regardless of network completion order.
#[derive(Clone)]
pub struct SyncEngine {
    fetcher: Arc<dyn QueryFetcher>,
    session: Arc<SessionStore>,
    entries: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
    in_flight: Arc<Mutex<HashMap<QueryKey, broadcast::Sender<FetchOutcome>>>>,
    hub: Arc<ChangeHub>,
    attached: Arc<Mutex<Option<Attachment>>>,
}

impl SyncEngine {
    /// Create an engine over a fetcher and the session store.
    pub fn new(fetcher: Arc<dyn QueryFetcher>, session: Arc<SessionStore>) -> Self {
        Self {
            fetcher,
            session,
            entries: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            hub: Arc::new(ChangeHub::new()),
            attached: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to change notifications for a logical query name.
    pub fn subscribe_changes(&self, name: &str) -> ChangeSubscription {
        self.hub.subscribe(name)
    }

    /// Read-only view of an entry, without triggering a fetch. Stale
    /// entries remain servable this way as "last known".
    pub fn peek(&self, key: &QueryKey) -> Option<CachedEntry> {
        let entries = self.entries.lock().expect("lock poisoned");
        entries.get(key).map(CachedEntry::from)
    }

    /// Return the cached value if fresh, otherwise perform (or join) the
    /// one in-flight fetch for this query identity.
    pub async fn get_or_fetch(&self, key: &QueryKey) -> CacheResult<Value> {
        loop {
            {
                let entries = self.entries.lock().expect("lock poisoned");
                if let Some(entry) = entries.get(key) {
                    if entry.fresh {
                        if let Some(value) = &entry.value {
                            return Ok(value.clone());
                        }
                    }
                }
            }

            if !self.session.is_authenticated() {
                return Err(CacheError::AuthenticationExpired);
            }

            match self.join_or_start_fetch(key) {
                Some(mut rx) => {
                    return match rx.recv().await {
                        Ok(outcome) => outcome,
                        // All senders gone without an outcome: the session
                        // was torn down under us.
                        Err(_) => Err(CacheError::AuthenticationExpired),
                    };
                }
                // Lost a race with a completing fetch; re-check the entry.
                None => continue,
            }
        }
    }

    /// Mark every entry matching the pattern stale and schedule refetches.
    ///
    /// Stale entries keep their last-known value. At most one refetch per
    /// query identity is in flight; a repeat invalidation reconfirms the
    /// stale mark and rides the existing fetch.
    pub fn invalidate(&self, pattern: &QueryPattern) {
        self.invalidate_where(|key| pattern.matches(key));
    }

    fn invalidate_where<F>(&self, matches: F)
    where
        F: Fn(&QueryKey) -> bool,
    {
        let marked: Vec<(QueryKey, u64)> = {
            let mut entries = self.entries.lock().expect("lock poisoned");
            entries
                .iter_mut()
                .filter(|(key, _)| matches(key))
                .map(|(key, entry)| {
                    entry.fresh = false;
                    entry.invalidated_at = entry.latest_ticket();
                    (key.clone(), entry.revision)
                })
                .collect()
        };

        for (key, revision) in marked {
            tracing::debug!(%key, "Cache entry invalidated");
            self.hub.notify(CacheChange {
                key: key.clone(),
                revision,
                reason: ChangeReason::Invalidated,
            });
            self.schedule_refetch(key);
        }
    }

    /// Overwrite an entry from a pushed snapshot, skipping the refetch
    /// round-trip.
    ///
    /// The write takes a ticket from the entry's own counter, so an older
    /// refetch completing later is discarded by the normal revision rule.
    pub fn write_direct(&self, key: &QueryKey, value: Value) {
        let revision = {
            let mut entries = self.entries.lock().expect("lock poisoned");
            let entry = entries.entry(key.clone()).or_default();
            let ticket = entry.take_ticket();
            entry.value = Some(value);
            entry.revision = ticket;
            entry.fresh = true;
            ticket
        };

        tracing::debug!(%key, revision, "Cache entry overwritten from pushed snapshot");
        self.hub.notify(CacheChange {
            key: key.clone(),
            revision,
            reason: ChangeReason::DirectWrite,
        });
    }

    /// Remove every entry and drop coalescing handles.
    ///
    /// Used on session end; in-flight fetches discard their own results via
    /// the session epoch check.
    pub fn clear_all(&self) {
        let keys: Vec<QueryKey> = {
            let mut entries = self.entries.lock().expect("lock poisoned");
            entries.drain().map(|(key, _)| key).collect()
        };
        self.in_flight.lock().expect("lock poisoned").clear();

        for key in keys {
            self.hub.notify(CacheChange {
                key,
                revision: 0,
                reason: ChangeReason::Cleared,
            });
        }
        tracing::info!("All cache entries cleared");
    }

    /// Map a domain event to cache effects.
    ///
    /// Exposed so the mapping is testable without a live feed; the
    /// handlers registered by [`attach_feed`](Self::attach_feed) call
    /// straight into this.
    pub fn handle_event(&self, event: &DomainEvent) {
        match event.kind {
            EventKind::OutstandingTotal => match &event.data {
                Some(data) if data.get("total").is_some() => {
                    self.write_direct(&QueryKey::new(queries::OUTSTANDING_TOTAL), data.clone());
                    // The pushed snapshot is the unfiltered aggregate;
                    // filtered variants still need a refetch.
                    self.invalidate_where(|key| {
                        key.name == queries::OUTSTANDING_TOTAL && key.is_filtered()
                    });
                }
                _ => {
                    tracing::debug!(
                        "Outstanding-total event without usable payload; falling back to invalidation"
                    );
                    self.invalidate(&QueryPattern::name(queries::OUTSTANDING_TOTAL));
                }
            },
            kind => {
                for name in patterns_for(kind) {
                    self.invalidate(&QueryPattern::name(*name));
                }
            }
        }
    }

    /// Register handlers for every event kind on the feed.
    pub fn attach_feed(&self, feed: &Arc<FeedClient>) {
        let handlers = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let engine = self.clone();
                let id = feed.on(kind, move |event| engine.handle_event(event));
                (kind, id)
            })
            .collect();

        let mut attached = self.attached.lock().expect("lock poisoned");
        *attached = Some(Attachment {
            feed: Arc::downgrade(feed),
            handlers,
        });
        tracing::debug!("Cache engine attached to event feed");
    }

    /// Whether feed handlers are currently registered.
    pub fn is_attached(&self) -> bool {
        self.attached.lock().expect("lock poisoned").is_some()
    }

    /// Unregister all feed handlers.
    pub fn detach_feed(&self) {
        let attachment = self.attached.lock().expect("lock poisoned").take();
        if let Some(attachment) = attachment {
            if let Some(feed) = attachment.feed.upgrade() {
                for (kind, id) in attachment.handlers {
                    feed.off(kind, id);
                }
            }
            tracing::debug!("Cache engine detached from event feed");
        }
    }

    /// Spawn the session-ended listener: clears caches and detaches from
    /// the feed whenever the credential transitions to absent.
    pub fn watch_session(&self) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        let mut rx = self.session.subscribe_ended();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ended) => {
                        tracing::info!(epoch = ended.epoch, "Session ended; clearing caches");
                        engine.clear_all();
                        engine.detach_feed();
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Join the in-flight fetch for a key, or start one.
    ///
    /// Returns None when an in-flight fetch completed between the caller's
    /// freshness check and now; the caller should re-check the entry.
    fn join_or_start_fetch(&self, key: &QueryKey) -> Option<broadcast::Receiver<FetchOutcome>> {
        let mut in_flight = self.in_flight.lock().expect("lock poisoned");

        if let Some(tx) = in_flight.get(key) {
            return Some(tx.subscribe());
        }

        // A fetch may have committed between the caller's freshness check
        // and this lock; starting another would be a wasted read.
        {
            let entries = self.entries.lock().expect("lock poisoned");
            if let Some(entry) = entries.get(key) {
                if entry.fresh && entry.value.is_some() {
                    return None;
                }
            }
        }

        let (tx, rx) = broadcast::channel(1);
        in_flight.insert(key.clone(), tx.clone());
        drop(in_flight);

        let ticket = {
            let mut entries = self.entries.lock().expect("lock poisoned");
            entries.entry(key.clone()).or_default().take_ticket()
        };
        let epoch = self.session.epoch();

        let engine = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            engine.run_fetch(key, ticket, epoch, tx).await;
        });

        Some(rx)
    }

    /// Start a background refetch unless one is already in flight.
    fn schedule_refetch(&self, key: QueryKey) {
        if !self.session.is_authenticated() {
            return;
        }

        {
            let in_flight = self.in_flight.lock().expect("lock poisoned");
            if in_flight.contains_key(&key) {
                // Reconfirmed stale; the existing fetch carries on and the
                // commit path chains a follow-up if it started too early.
                return;
            }
        }

        if let Some(mut rx) = self.join_or_start_fetch(&key) {
            tokio::spawn(async move {
                if let Ok(Err(e)) = rx.recv().await {
                    tracing::warn!(error = %e, "Background refetch failed; entry remains stale");
                }
            });
        }
    }

    /// Drive one fetch to completion and commit by revision.
    async fn run_fetch(
        &self,
        key: QueryKey,
        ticket: u64,
        epoch: u64,
        tx: broadcast::Sender<FetchOutcome>,
    ) {
        let result = self.fetcher.fetch(&key).await;

        let (outcome, change, needs_refetch) = match result {
            Ok(value) => {
                if self.session.epoch() != epoch {
                    tracing::debug!(%key, "Discarding fetch result from an ended session");
                    (Err(CacheError::AuthenticationExpired), None, false)
                } else {
                    let mut entries = self.entries.lock().expect("lock poisoned");
                    let entry = entries.entry(key.clone()).or_default();

                    if ticket > entry.revision {
                        entry.value = Some(value.clone());
                        entry.revision = ticket;
                        entry.fresh = ticket > entry.invalidated_at;
                        let stale_commit = !entry.fresh;
                        (
                            Ok(value),
                            Some(CacheChange {
                                key: key.clone(),
                                revision: ticket,
                                reason: ChangeReason::Committed,
                            }),
                            stale_commit,
                        )
                    } else {
                        tracing::debug!(
                            %key,
                            ticket,
                            revision = entry.revision,
                            "Discarding refetch that lost to a newer revision"
                        );
                        // Waiters get the newer committed value.
                        let served = entry.value.clone().unwrap_or(value);
                        (Ok(served), None, false)
                    }
                }
            }
            Err(FetchFailure::Unauthorized) => {
                (Err(CacheError::AuthenticationExpired), None, false)
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Fetch failed; entry keeps its last-known value");
                (Err(CacheError::Fetch(e)), None, false)
            }
        };

        // Release the coalescing slot before notifying so a follow-up
        // refetch can start immediately.
        self.in_flight.lock().expect("lock poisoned").remove(&key);

        if let Some(change) = change {
            self.hub.notify(change);
        }

        if needs_refetch && self.session.is_authenticated() {
            tracing::debug!(%key, "Commit predates latest invalidation; scheduling follow-up refetch");
            self.schedule_refetch(key);
        }

        let _ = tx.send(outcome);
    }
}
