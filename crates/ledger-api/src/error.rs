//! Transport error types.

use thiserror::Error;

/// Error type for ledger API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the credential (401). The session store has
    /// already been cleared by the time the caller sees this.
    #[error("Authorization rejected by server")]
    Unauthorized,

    /// Network-level failure (connect, timeout, protocol). Eligible for the
    /// single-retry rule on idempotent reads.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-401 error status. Surfaced verbatim,
    /// never retried.
    #[error("Server rejected request: {status} {body}")]
    Server { status: u16, body: String },

    /// Response body was not the expected JSON shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
