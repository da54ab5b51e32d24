//! The ledger client facade.
//!
//! Wires the session store, REST transport, event feed, and cache sync
//! engine into the surface UI consumers use:
//!
//! - `login` / `logout` and the `authenticated` flag
//! - `get_or_fetch` / `invalidate` / `peek` over named query caches
//! - cache change subscriptions for re-rendering
//!
//! Mutations go straight through the [`ApiClient`]; their effects come back
//! asynchronously over the feed and land in the caches.

mod client;
mod fetcher;

pub use client::{ClientError, ClientResult, LedgerClient};
pub use fetcher::ApiFetcher;

pub use ledger_api::{ApiClient, ApiError};
pub use ledger_cache::{
    queries, CacheChange, CacheError, CachedEntry, ChangeReason, ChangeSubscription, QueryKey,
    QueryPattern,
};
pub use ledger_core::{Config, Paths};
pub use ledger_feed::{FeedError, FeedState};
pub use ledger_protocol_types::{
    Direction, DomainEvent, EventKind, NewParty, NewTransaction, NewTransactionType,
    OutstandingTotal, Party, Transaction, TransactionFilter, TransactionType,
};
pub use ledger_session::{Credential, SessionEnded, SessionStore};
