//! Session credential ownership for the ledger client.
//!
//! This crate provides:
//! - The bearer [`Credential`] and its durable [`TokenStorage`] backends
//! - [`SessionStore`], the single owner of the credential
//! - A process-wide session-ended broadcast with a monotonic session epoch
//!
//! Every other component reads the credential through the store; only the
//! store mutates it.

mod credential;
mod storage;
mod store;

pub use credential::Credential;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::{SessionEnded, SessionStore};

use thiserror::Error;

/// Error type for session storage operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
