//! The cache consistency core.
//!
//! Owns a set of named query caches and keeps them consistent with server
//! state announced over the event feed:
//!
//! - `get_or_fetch` with request coalescing (one underlying read per query
//!   identity, however many concurrent callers)
//! - `invalidate` marks entries stale, keeps the last-known value servable,
//!   and schedules a single background refetch per identity
//! - writes to one entry are totally ordered by a per-entry revision
//!   counter; a refetch that loses the race is discarded, never served
//! - domain events map to invalidations (or, for the outstanding-total
//!   snapshot, a direct ticketed overwrite)
//! - session end clears every entry and detaches from the feed; results of
//!   fetches started under an older session epoch are discarded on arrival

mod engine;
mod entry;
mod error;
mod fetcher;
mod hub;
mod key;
mod mapping;

#[cfg(test)]
mod tests;

pub use engine::SyncEngine;
pub use entry::CachedEntry;
pub use error::{CacheError, CacheResult, FetchFailure};
pub use fetcher::QueryFetcher;
pub use hub::{CacheChange, ChangeHub, ChangeReason, ChangeSubscription};
pub use key::{QueryKey, QueryPattern};
pub use mapping::{patterns_for, queries};
