//! WebSocket event feed client for the ledger.
//!
//! This crate provides:
//! - A single logical subscription to the server's domain-event push channel
//! - An explicit connection lifecycle state machine with a terminal Closed
//!   state
//! - Automatic reconnection with jittered exponential backoff
//! - A typed dispatch table: per-kind handler lists, invoked in
//!   registration order, with panic isolation

mod backoff;
mod client;
mod dispatch;
mod error;
mod state;

#[cfg(test)]
mod tests;

pub use backoff::BackoffPolicy;
pub use client::{FeedClient, FeedConfig, FeedLifecycle};
pub use dispatch::{Dispatcher, HandlerId};
pub use error::{FeedError, FeedResult};
pub use state::FeedState;
