//! Domain event to cache invalidation mapping.

use ledger_protocol_types::EventKind;

/// Logical query names used by the ledger caches.
pub mod queries {
    pub const PARTIES: &str = "parties";
    pub const TRANSACTION_TYPES: &str = "transaction-types";
    pub const TRANSACTIONS: &str = "transactions";
    pub const OUTSTANDING_TOTAL: &str = "outstanding-total";
}

/// The logical query names an event kind invalidates.
///
/// Party and transaction-type mutations also invalidate the transactions
/// list: their names are denormalized into transaction display rows. The
/// `outstanding_total` snapshot normally bypasses this table via a direct
/// write; this entry is its fallback when the payload is unusable.
pub fn patterns_for(kind: EventKind) -> &'static [&'static str] {
    use queries::*;

    match kind {
        EventKind::PartyCreated => &[PARTIES, OUTSTANDING_TOTAL],
        EventKind::PartyUpdated | EventKind::PartyDeleted => {
            &[PARTIES, TRANSACTIONS, OUTSTANDING_TOTAL]
        }
        EventKind::TransactionTypeCreated => &[TRANSACTION_TYPES],
        EventKind::TransactionTypeUpdated | EventKind::TransactionTypeDeleted => {
            &[TRANSACTION_TYPES, TRANSACTIONS, OUTSTANDING_TOTAL]
        }
        EventKind::TransactionCreated
        | EventKind::TransactionUpdated
        | EventKind::TransactionDeleted => &[TRANSACTIONS, OUTSTANDING_TOTAL],
        EventKind::OutstandingTotal => &[OUTSTANDING_TOTAL],
    }
}
