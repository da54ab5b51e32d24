//! Domain events pushed by the server over the event feed.

use serde::{Deserialize, Serialize};

/// Kinds of domain events the server broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // Parties
    PartyCreated,
    PartyUpdated,
    PartyDeleted,

    // Transaction types
    TransactionTypeCreated,
    TransactionTypeUpdated,
    TransactionTypeDeleted,

    // Transactions
    TransactionCreated,
    TransactionUpdated,
    TransactionDeleted,

    // Derived aggregate snapshot
    OutstandingTotal,
}

impl EventKind {
    /// All kinds, in a stable order. Used to register blanket handlers.
    pub const ALL: [EventKind; 10] = [
        EventKind::PartyCreated,
        EventKind::PartyUpdated,
        EventKind::PartyDeleted,
        EventKind::TransactionTypeCreated,
        EventKind::TransactionTypeUpdated,
        EventKind::TransactionTypeDeleted,
        EventKind::TransactionCreated,
        EventKind::TransactionUpdated,
        EventKind::TransactionDeleted,
        EventKind::OutstandingTotal,
    ];
}

/// A domain event as broadcast by the server: `{"type": ..., "data": ...}`.
///
/// The payload is opaque to the consistency core; only the
/// `outstanding_total` snapshot is ever inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl DomainEvent {
    /// Create an event with no payload.
    pub fn new(kind: EventKind) -> Self {
        Self { kind, data: None }
    }

    /// Create an event with a payload.
    pub fn with_data(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            data: Some(data),
        }
    }

    /// Serialize to the wire format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the wire format.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
