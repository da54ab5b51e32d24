//! Shared harness for facade integration tests: a hand-rolled HTTP ledger
//! server and a WebSocket feed server, both on loopback ports.

// Each integration test binary compiles its own copy; not all of them use
// every helper.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

const LOGIN_ID: &str = "admin";
const PASSWORD: &str = "secret";

struct LedgerState {
    parties: Vec<Value>,
    transaction_types: Vec<Value>,
    transactions: Vec<Value>,
    total: f64,
    tokens: HashSet<String>,
    next_token: usize,
    force_401: bool,
    drop_next: usize,
    requests: Vec<String>,
}

/// A minimal HTTP/1.1 ledger API server.
pub struct MockLedgerServer {
    addr: SocketAddr,
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedgerServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(Mutex::new(LedgerState {
            parties: Vec::new(),
            transaction_types: Vec::new(),
            transactions: Vec::new(),
            total: 0.0,
            tokens: HashSet::new(),
            next_token: 0,
            force_401: false,
            drop_next: 0,
            requests: Vec::new(),
        }));

        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    pub fn set_transactions(&self, transactions: Vec<Value>) {
        self.state.lock().unwrap().transactions = transactions;
    }

    pub fn push_transaction(&self, transaction: Value) {
        self.state.lock().unwrap().transactions.push(transaction);
    }

    pub fn set_parties(&self, parties: Vec<Value>) {
        self.state.lock().unwrap().parties = parties;
    }

    pub fn set_total(&self, total: f64) {
        self.state.lock().unwrap().total = total;
    }

    /// Respond 401 to every authenticated endpoint from now on.
    pub fn set_force_401(&self, force: bool) {
        self.state.lock().unwrap().force_401 = force;
    }

    /// Drop the next `n` connections before answering (network failure).
    pub fn set_drop_next(&self, n: usize) {
        self.state.lock().unwrap().drop_next = n;
    }

    /// Fully-served requests, as "METHOD path" strings.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<LedgerState>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    // Read until end of headers.
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = headers.lines();
    let request_line = lines.next().unwrap_or_default().to_string();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();
    let path = target.split('?').next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut bearer: Option<String> = None;
    for line in lines {
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
        if lower.starts_with("authorization:") {
            bearer = line
                .splitn(2, ':')
                .nth(1)
                .map(|v| v.trim())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|v| v.to_string());
        }
    }

    // Read the body.
    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = buf[body_start..(body_start + content_length).min(buf.len())].to_vec();

    // Simulated network failure: close without answering.
    {
        let mut state = state.lock().unwrap();
        if state.drop_next > 0 {
            state.drop_next -= 1;
            return Ok(());
        }
        state.requests.push(format!("{} {}", method, path));
    }

    let (status, payload) = route(&method, &path, &body, bearer.as_deref(), &state);
    let body = payload.to_string();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn route(
    method: &str,
    path: &str,
    body: &[u8],
    bearer: Option<&str>,
    state: &Arc<Mutex<LedgerState>>,
) -> (&'static str, Value) {
    if method == "POST" && path == "/api/v1/auth/login" {
        let Ok(request) = serde_json::from_slice::<Value>(body) else {
            return ("400 Bad Request", json!({"detail": "malformed body"}));
        };
        if request["login_id"] == LOGIN_ID && request["password"] == PASSWORD {
            let token = {
                let mut state = state.lock().unwrap();
                state.next_token += 1;
                let token = format!("token-{}", state.next_token);
                state.tokens.insert(token.clone());
                token
            };
            return (
                "200 OK",
                json!({
                    "access_token": token,
                    "token_type": "bearer",
                    "expires_in_hours": 8
                }),
            );
        }
        return ("401 Unauthorized", json!({"detail": "Invalid login ID or password"}));
    }

    // Everything else requires a valid token.
    let authorized = {
        let state = state.lock().unwrap();
        !state.force_401 && bearer.map(|t| state.tokens.contains(t)).unwrap_or(false)
    };
    if !authorized {
        return ("401 Unauthorized", json!({"detail": "Could not validate credentials"}));
    }

    let state = state.lock().unwrap();
    match (method, path) {
        ("GET", "/api/v1/parties/") => ("200 OK", json!(state.parties)),
        ("GET", "/api/v1/transaction-types/") => ("200 OK", json!(state.transaction_types)),
        ("GET", "/api/v1/transactions/") => ("200 OK", json!(state.transactions)),
        ("GET", "/api/v1/transactions/outstanding/total") => {
            ("200 OK", json!({"total": state.total}))
        }
        _ => ("404 Not Found", json!({"detail": "Not found"})),
    }
}

/// A WebSocket feed server pushing scripted event frames.
pub struct MockFeedServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    frames_tx: broadcast::Sender<String>,
    drop_tx: broadcast::Sender<()>,
}

impl MockFeedServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connections = Arc::new(AtomicUsize::new(0));
        let (frames_tx, _) = broadcast::channel::<String>(64);
        let (drop_tx, _) = broadcast::channel::<()>(8);

        let accept_connections = connections.clone();
        let accept_frames = frames_tx.clone();
        let accept_drop = drop_tx.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                accept_connections.fetch_add(1, Ordering::SeqCst);

                let mut frames_rx = accept_frames.subscribe();
                let mut drop_rx = accept_drop.subscribe();
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };

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
                            _ = drop_rx.recv() => break,
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
            frames_tx,
            drop_tx,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/feed", self.addr)
    }

    pub fn push_event(&self, kind: &str, data: Value) {
        let _ = self
            .frames_tx
            .send(json!({"type": kind, "data": data}).to_string());
    }

    pub fn drop_connections(&self) {
        let _ = self.drop_tx.send(());
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
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
