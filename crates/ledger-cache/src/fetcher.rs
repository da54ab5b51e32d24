//! The fetcher seam between the cache engine and the REST transport.

use crate::{FetchFailure, QueryKey};
use futures_util::future::BoxFuture;
use serde_json::Value;

/// Performs the underlying read for a query identity.
///
/// The production implementation resolves the key to a ledger API endpoint
/// and applies the transport's single-retry rule; tests substitute scripted
/// fetchers to control completion order.
pub trait QueryFetcher: Send + Sync + 'static {
    /// Fetch the current server-side value for a query.
    fn fetch(&self, key: &QueryKey) -> BoxFuture<'static, Result<Value, FetchFailure>>;
}
