//! Integration tests for the feed client.
//!
//! - `harness.rs`    - Mock WebSocket feed server
//! - `connection.rs` - Connection lifecycle (connect/close/no-op/terminal)
//! - `delivery.rs`   - Event delivery, ordering, handler isolation
//! - `reconnect.rs`  - Automatic reconnection after connection loss

mod delivery;
pub(crate) mod harness;
