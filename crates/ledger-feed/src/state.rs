//! Connection lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌──────────────┐  ConnectRequested   ┌──────────────┐
//! │ Disconnected │ ──────────────────► │  Connecting  │
//! └──────┬───────┘                     └──────┬───────┘
//!        ▲                                    │
//!        │ ConnectionLost /                   │ HandshakeSucceeded
//!        │ HandshakeFailed                    ▼
//!        │                             ┌──────────────┐
//!        └──────────────────────────── │  Connected   │
//!                                      └──────────────┘
//!
//! CloseRequested from any state ──► Closed (terminal)
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Generates a module `feed_machine` with State, Input, and StateMachine.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub feed_machine(Disconnected)

    Disconnected => {
        ConnectRequested => Connecting,
        CloseRequested => Closed
    },
    Connecting => {
        HandshakeSucceeded => Connected,
        HandshakeFailed => Disconnected,
        CloseRequested => Closed
    },
    Connected => {
        ConnectionLost => Disconnected,
        CloseRequested => Closed
    },
    Closed => {
        // Terminal; repeated close is idempotent.
        CloseRequested => Closed
    }
}

pub use feed_machine::Input as FeedMachineInput;
pub use feed_machine::State as FeedMachineState;
pub use feed_machine::StateMachine as FeedMachine;

/// Connection state as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    /// No connection; a reconnect may be pending.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receiving events.
    Connected,
    /// Permanently torn down; the client cannot be reused.
    Closed,
}

impl FeedState {
    /// Returns true once the client is past resurrection.
    pub fn is_closed(&self) -> bool {
        matches!(self, FeedState::Closed)
    }
}

impl From<&FeedMachineState> for FeedState {
    fn from(state: &FeedMachineState) -> Self {
        match state {
            FeedMachineState::Disconnected => FeedState::Disconnected,
            FeedMachineState::Connecting => FeedState::Connecting,
            FeedMachineState::Connected => FeedState::Connected,
            FeedMachineState::Closed => FeedState::Closed,
        }
    }
}
