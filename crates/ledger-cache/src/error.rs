//! Cache error types.
//!
//! Errors are `Clone` because coalesced callers all receive the outcome of
//! the one shared fetch.

use thiserror::Error;

/// Why an underlying read failed. Produced by the [`QueryFetcher`] seam.
///
/// [`QueryFetcher`]: crate::QueryFetcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Network-level failure (after the transport's retry rule ran).
    #[error("Network failure: {0}")]
    Network(String),

    /// The server answered with a non-401 error status.
    #[error("Server rejected request: {status} {message}")]
    Rejected { status: u16, message: String },

    /// The server rejected the credential. The session store is cleared by
    /// the transport before this surfaces.
    #[error("Authorization rejected")]
    Unauthorized,
}

/// Error type returned to cache readers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The session has ended; the cache will not contact the server.
    #[error("Session ended; authentication required")]
    AuthenticationExpired,

    /// The underlying read failed. The entry keeps its last-known value.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchFailure),
}

/// Result type alias using CacheError.
pub type CacheResult<T> = Result<T, CacheError>;
