//! Integration tests for the cache sync engine.
//!
//! - `harness.rs`      - Manually-resolved fetcher for completion-order control
//! - `coalescing.rs`   - Request coalescing under concurrent readers
//! - `revisions.rs`    - Last-writer-wins by revision, chained refetches
//! - `invalidation.rs` - Stale marks, last-known serving, refetch scheduling
//! - `session.rs`      - Session-end clearing and epoch discard
//! - `events.rs`       - Domain event to cache effect mapping
