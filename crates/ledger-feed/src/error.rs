//! Feed error types.

use thiserror::Error;

/// Error type for the event feed client.
#[derive(Error, Debug)]
pub enum FeedError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The client was closed; a closed client cannot be reconnected.
    #[error("Feed client is closed")]
    Closed,

    /// No credential available for the stream handshake.
    #[error("No session credential for feed handshake")]
    MissingCredential,

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using FeedError.
pub type FeedResult<T> = Result<T, FeedError>;
