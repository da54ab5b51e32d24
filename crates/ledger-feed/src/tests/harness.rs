//! Test harness for feed client integration tests.
//!
//! Provides `MockFeedServer`: a real WebSocket server on a loopback port
//! that records handshake tokens, pushes scripted frames to connected
//! clients, and can drop connections on demand.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// A WebSocket server for driving the feed client in tests.
pub struct MockFeedServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
    frames_tx: broadcast::Sender<String>,
    drop_tx: broadcast::Sender<()>,
    _accept_handle: JoinHandle<()>,
}

impl MockFeedServer {
    /// Bind a loopback port and start accepting connections.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connections = Arc::new(AtomicUsize::new(0));
        let tokens: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let (frames_tx, _) = broadcast::channel::<String>(64);
        let (drop_tx, _) = broadcast::channel::<()>(8);

        let accept_connections = connections.clone();
        let accept_tokens = tokens.clone();
        let accept_frames = frames_tx.clone();
        let accept_drop = drop_tx.clone();

        let accept_handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                accept_connections.fetch_add(1, Ordering::SeqCst);

                // Subscribe before the handshake so frames pushed right
                // after the client reports Connected are not missed.
                let mut frames_rx = accept_frames.subscribe();
                let mut drop_rx = accept_drop.subscribe();
                let tokens = accept_tokens.clone();

                tokio::spawn(async move {
                    let token_slot: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
                    let callback_slot = token_slot.clone();

                    let callback = move |req: &Request, response: Response| {
                        let token = req.uri().query().and_then(|query| {
                            query.split('&').find_map(|pair| {
                                pair.strip_prefix("token=").map(|value| value.to_string())
                            })
                        });
                        *callback_slot.lock().unwrap() = token;
                        Ok(response)
                    };

                    let Ok(mut ws) =
                        tokio_tungstenite::accept_hdr_async(stream, callback).await
                    else {
                        return;
                    };

                    tokens.lock().unwrap().push(token_slot.lock().unwrap().clone());

                    loop {
                        tokio::select! {
                            frame = frames_rx.recv() => {
                                match frame {
                                    Ok(frame) => {
                                        if ws.send(Message::Text(frame)).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => break,
                                }
                            }
                            _ = drop_rx.recv() => {
                                // Abrupt close: drop the stream without a
                                // close frame.
                                break;
                            }
                            incoming = ws.next() => {
                                match incoming {
                                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                    _ => {}
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            connections,
            tokens,
            frames_tx,
            drop_tx,
            _accept_handle: accept_handle,
        }
    }

    /// The ws:// URL clients should connect to.
    pub fn url(&self) -> String {
        format!("ws://{}/feed", self.addr)
    }

    /// Push a raw frame to every connected client.
    pub fn push(&self, frame: &str) {
        let _ = self.frames_tx.send(frame.to_string());
    }

    /// Push a domain event frame.
    pub fn push_event(&self, kind: &str, data: serde_json::Value) {
        self.push(&serde_json::json!({"type": kind, "data": data}).to_string());
    }

    /// Abruptly drop every active connection.
    pub fn drop_connections(&self) {
        let _ = self.drop_tx.send(());
    }

    /// How many connections have been accepted in total.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Tokens presented on each handshake, in connection order.
    pub fn handshake_tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

/// Poll until `predicate` holds or the timeout elapses.
pub async fn wait_until<F>(predicate: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
