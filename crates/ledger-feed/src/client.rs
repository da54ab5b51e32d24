//! The feed client: connection supervision, reconnect, dispatch.

use crate::state::{FeedMachine, FeedMachineInput, FeedMachineState};
use crate::{BackoffPolicy, Dispatcher, FeedError, FeedResult, FeedState, HandlerId};
use futures_util::{SinkExt, StreamExt};
use ledger_protocol_types::{DomainEvent, EventKind};
use ledger_session::SessionStore;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed WebSocket URL (e.g. wss://ledger.example.com/api/v1/ws).
    pub url: String,
    /// Reconnect backoff policy.
    pub backoff: BackoffPolicy,
}

impl FeedConfig {
    /// Create a config with the default backoff policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Lifecycle notifications emitted by the feed client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedLifecycle {
    /// Handshake succeeded; events are flowing.
    Connected,
    /// A connected stream was lost; a reconnect is scheduled.
    Disconnected,
    /// The client was explicitly closed; no reconnect will happen.
    Closed,
}

/// WebSocket feed client with automatic reconnection.
///
/// One logical subscription to the server's event push channel. The
/// connection lifecycle is an explicit state machine; `close()` is terminal
/// and a closed client rejects `connect()`.
pub struct FeedClient {
    config: FeedConfig,
    session: Arc<SessionStore>,
    machine: Arc<Mutex<FeedMachine>>,
    dispatcher: Arc<Dispatcher>,
    attempts: Arc<AtomicU32>,
    lifecycle_tx: broadcast::Sender<FeedLifecycle>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl FeedClient {
    /// Create a new feed client.
    pub fn new(config: FeedConfig, session: Arc<SessionStore>) -> Self {
        let (lifecycle_tx, _) = broadcast::channel(16);

        Self {
            config,
            session,
            machine: Arc::new(Mutex::new(FeedMachine::new())),
            dispatcher: Arc::new(Dispatcher::new()),
            attempts: Arc::new(AtomicU32::new(0)),
            lifecycle_tx,
            supervisor: Mutex::new(None),
        }
    }

    /// Subscribe to lifecycle notifications.
    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<FeedLifecycle> {
        self.lifecycle_tx.subscribe()
    }

    /// The current connection state.
    pub fn state(&self) -> FeedState {
        FeedState::from(self.machine.lock().expect("lock poisoned").state())
    }

    /// Whether the stream is currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == FeedState::Connected
    }

    /// Register a handler for an event kind.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.dispatcher.on(kind, handler)
    }

    /// Unregister a handler.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.dispatcher.off(kind, id)
    }

    /// Start the connection supervisor.
    ///
    /// No-op when already connecting or connected; rejected once closed.
    pub fn connect(&self) -> FeedResult<()> {
        let mut machine = self.machine.lock().expect("lock poisoned");
        match machine.state() {
            FeedMachineState::Closed => return Err(FeedError::Closed),
            FeedMachineState::Connecting | FeedMachineState::Connected => {
                tracing::debug!("Feed already connecting or connected");
                return Ok(());
            }
            FeedMachineState::Disconnected => {}
        }

        {
            let supervisor = self.supervisor.lock().expect("lock poisoned");
            if supervisor.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
                // A live supervisor is waiting out a backoff; it owns the
                // reconnect.
                tracing::debug!("Feed reconnect already scheduled");
                return Ok(());
            }
        }

        let _ = machine.consume(&FeedMachineInput::ConnectRequested);
        drop(machine);

        let handle = tokio::spawn(Self::run_supervisor(
            self.config.clone(),
            self.session.clone(),
            self.machine.clone(),
            self.dispatcher.clone(),
            self.attempts.clone(),
            self.lifecycle_tx.clone(),
        ));
        *self.supervisor.lock().expect("lock poisoned") = Some(handle);

        Ok(())
    }

    /// Permanently tear down the feed.
    ///
    /// Idempotent. Cancels any pending reconnect timer and releases the
    /// underlying connection. After this, `connect()` fails with
    /// [`FeedError::Closed`].
    pub fn close(&self) {
        {
            let mut machine = self.machine.lock().expect("lock poisoned");
            if *machine.state() == FeedMachineState::Closed {
                return;
            }
            let _ = machine.consume(&FeedMachineInput::CloseRequested);
        }

        if let Some(handle) = self.supervisor.lock().expect("lock poisoned").take() {
            handle.abort();
        }

        tracing::info!("Feed client closed");
        let _ = self.lifecycle_tx.send(FeedLifecycle::Closed);
    }

    /// Consume a state machine input, ignoring impossible transitions.
    fn transition(machine: &Mutex<FeedMachine>, input: FeedMachineInput) {
        let mut machine = machine.lock().expect("lock poisoned");
        if machine.consume(&input).is_err() {
            tracing::debug!(state = ?machine.state(), "Ignored impossible feed transition");
        }
    }

    /// Supervisor loop: run one connection, then back off and retry until
    /// the client is closed.
    async fn run_supervisor(
        config: FeedConfig,
        session: Arc<SessionStore>,
        machine: Arc<Mutex<FeedMachine>>,
        dispatcher: Arc<Dispatcher>,
        attempts: Arc<AtomicU32>,
        lifecycle_tx: broadcast::Sender<FeedLifecycle>,
    ) {
        loop {
            if *machine.lock().expect("lock poisoned").state() == FeedMachineState::Closed {
                break;
            }

            Self::run_connection(&config, &session, &machine, &dispatcher, &attempts, &lifecycle_tx)
                .await;

            if *machine.lock().expect("lock poisoned").state() == FeedMachineState::Closed {
                break;
            }

            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            let delay = config.backoff.delay_for_attempt(attempt);
            tracing::info!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Scheduling feed reconnect"
            );
            tokio::time::sleep(delay).await;

            {
                let mut machine = machine.lock().expect("lock poisoned");
                if *machine.state() == FeedMachineState::Closed {
                    break;
                }
                let _ = machine.consume(&FeedMachineInput::ConnectRequested);
            }
        }
    }

    /// Open one WebSocket connection and pump it until it ends.
    async fn run_connection(
        config: &FeedConfig,
        session: &Arc<SessionStore>,
        machine: &Mutex<FeedMachine>,
        dispatcher: &Dispatcher,
        attempts: &AtomicU32,
        lifecycle_tx: &broadcast::Sender<FeedLifecycle>,
    ) {
        // The handshake requires the current credential.
        let credential = match session.credential() {
            Some(credential) => credential,
            None => {
                tracing::warn!("No session credential for feed handshake");
                Self::transition(machine, FeedMachineInput::HandshakeFailed);
                return;
            }
        };

        let handshake_url = format!("{}?token={}", config.url, credential.token);
        tracing::debug!(url = %config.url, "Opening feed connection");

        let ws_stream = match connect_async(handshake_url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "Feed handshake failed");
                Self::transition(machine, FeedMachineInput::HandshakeFailed);
                return;
            }
        };

        Self::transition(machine, FeedMachineInput::HandshakeSucceeded);
        if *machine.lock().expect("lock poisoned").state() != FeedMachineState::Connected {
            // close() won the race during the handshake; drop the stream.
            return;
        }
        attempts.store(0, Ordering::SeqCst);
        tracing::info!(url = %config.url, "Feed connected");
        let _ = lifecycle_tx.send(FeedLifecycle::Connected);

        let (mut write, mut read) = ws_stream.split();

        // Outbound channel so the read loop can answer pings.
        let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(64);
        let sender_handle = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        // Single reader: same-kind events dispatch in arrival order.
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match DomainEvent::from_json(&text) {
                    Ok(event) => {
                        tracing::debug!(kind = ?event.kind, "Feed event received");
                        dispatcher.dispatch(&event);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to decode feed frame");
                    }
                },
                Ok(Message::Ping(data)) => {
                    let _ = msg_tx.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Feed connection closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Feed connection error");
                    break;
                }
            }
        }

        sender_handle.abort();
        Self::transition(machine, FeedMachineInput::ConnectionLost);
        let _ = lifecycle_tx.send(FeedLifecycle::Disconnected);
    }
}
