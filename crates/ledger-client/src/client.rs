//! The consumer-facing facade.

use crate::ApiFetcher;
use ledger_api::{ApiClient, ApiError};
use ledger_cache::{
    CacheError, CacheResult, CachedEntry, ChangeSubscription, QueryKey, QueryPattern, SyncEngine,
};
use ledger_core::{Config, CoreError, Paths};
use ledger_feed::{FeedClient, FeedConfig, FeedError, FeedState};
use ledger_session::{FileTokenStorage, SessionStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Error type for facade operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Feed error
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// The ledger client: session, transport, feed, and caches wired together.
///
/// Must be constructed inside a tokio runtime; construction spawns the
/// session-ended listeners.
pub struct LedgerClient {
    config: Config,
    session: Arc<SessionStore>,
    api: ApiClient,
    // Shared with the session-ended listener, which must close whichever
    // feed client is current at that moment.
    feed: Arc<Mutex<Arc<FeedClient>>>,
    engine: SyncEngine,
    _listeners: Vec<JoinHandle<()>>,
}

impl LedgerClient {
    /// Create a client persisting the credential under the given paths.
    pub fn new(config: &Config, paths: &Paths) -> ClientResult<Self> {
        let storage = FileTokenStorage::new(paths.session_file());
        let session = Arc::new(SessionStore::new(Box::new(storage)));
        Self::with_session_store(config, session)
    }

    /// Create a client over an existing session store.
    pub fn with_session_store(config: &Config, session: Arc<SessionStore>) -> ClientResult<Self> {
        let api = ApiClient::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            session.clone(),
        )?;

        let feed = Arc::new(FeedClient::new(
            FeedConfig::new(config.feed_url.clone()),
            session.clone(),
        ));

        let engine = SyncEngine::new(Arc::new(ApiFetcher::new(api.clone())), session.clone());
        engine.attach_feed(&feed);

        let feed = Arc::new(Mutex::new(feed));

        // Session end tears down both: the engine clears its caches and
        // detaches; the feed is disconnected by this owning layer.
        let engine_listener = engine.watch_session();
        let feed_listener = {
            let feed = feed.clone();
            let mut rx = session.subscribe_ended();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(_) => feed.lock().expect("lock poisoned").close(),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        };

        Ok(Self {
            config: config.clone(),
            session,
            api,
            feed,
            engine,
            _listeners: vec![engine_listener, feed_listener],
        })
    }

    /// The session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The REST transport, for mutation requests.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The cache sync engine.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Whether a session credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Current feed connection state.
    pub fn feed_state(&self) -> FeedState {
        self.feed.lock().expect("lock poisoned").state()
    }

    /// Log in and bring up the event feed.
    pub async fn login(&self, login_id: &str, password: &str) -> ClientResult<()> {
        self.api.login(login_id, password).await?;
        self.ensure_feed().connect()?;
        Ok(())
    }

    /// Log out: end the session and tear down stream state.
    ///
    /// Also runs when any request observes a 401; both paths converge on
    /// the session-ended broadcast, so calling this after a forced
    /// invalidation is a no-op.
    pub fn logout(&self) {
        // Credential first: the epoch bump makes any in-flight fetch
        // discard its result instead of repopulating the caches.
        self.session.clear_credential();
        self.feed.lock().expect("lock poisoned").close();
        self.engine.clear_all();
        self.engine.detach_feed();
        tracing::info!("Logged out");
    }

    /// Cached read with request coalescing; see [`SyncEngine::get_or_fetch`].
    pub async fn get_or_fetch(&self, key: &QueryKey) -> CacheResult<serde_json::Value> {
        self.engine.get_or_fetch(key).await
    }

    /// Mark matching entries stale and schedule refetches.
    pub fn invalidate(&self, pattern: &QueryPattern) {
        self.engine.invalidate(pattern);
    }

    /// Last-known view of an entry without fetching.
    pub fn peek(&self, key: &QueryKey) -> Option<CachedEntry> {
        self.engine.peek(key)
    }

    /// Subscribe to change notifications for a logical query name.
    pub fn subscribe_changes(&self, name: &str) -> ChangeSubscription {
        self.engine.subscribe_changes(name)
    }

    /// Current feed, replacing a closed one with a fresh client.
    ///
    /// A closed feed cannot be resurrected, so a re-login after logout (or
    /// after a 401 teardown) gets a fresh connection object with the
    /// engine's handlers re-attached.
    fn ensure_feed(&self) -> Arc<FeedClient> {
        let mut slot = self.feed.lock().expect("lock poisoned");
        if slot.state().is_closed() {
            tracing::debug!("Replacing closed feed client");
            let fresh = Arc::new(FeedClient::new(
                FeedConfig::new(self.config.feed_url.clone()),
                self.session.clone(),
            ));
            self.engine.detach_feed();
            self.engine.attach_feed(&fresh);
            *slot = fresh;
        }
        slot.clone()
    }
}
