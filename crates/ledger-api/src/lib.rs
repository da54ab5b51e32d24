//! REST transport for the ledger API.
//!
//! This crate provides:
//! - [`ApiClient`]: issues REST calls with the session bearer token attached
//! - Authorization-failure detection: any 401 clears the credential through
//!   the session store (which deduplicates the session-ended broadcast)
//! - A single-retry rule for idempotent refetch reads
//! - Typed endpoint helpers over the opaque request core

mod client;
mod endpoints;
mod error;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
