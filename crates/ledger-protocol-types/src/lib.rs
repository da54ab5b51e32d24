//! Wire types shared by the ledger REST transport and the event feed.
//!
//! This crate has no I/O. It defines:
//! - Domain events pushed by the server over the feed
//! - Ledger entity models returned by the REST API
//! - Login request/response shapes

mod events;
mod models;

pub use events::{DomainEvent, EventKind};
pub use models::{
    Direction, LoginRequest, NewParty, NewTransaction, NewTransactionType, OutstandingTotal,
    Party, TokenResponse, Transaction, TransactionFilter, TransactionType,
};
