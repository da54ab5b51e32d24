//! Ledger entity models returned by the REST API.
//!
//! The consistency core treats response bodies as opaque payloads; these
//! models exist for typed access at the API helper layer and in consumers.

use serde::{Deserialize, Serialize};

/// A party (customer/supplier) in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Body for creating or updating a party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParty {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Whether a transaction type adds to or reduces the outstanding total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Add,
    Reduce,
}

/// A transaction type (note + direction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionType {
    pub id: i64,
    pub note: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Body for creating or updating a transaction type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionType {
    pub note: String,
    #[serde(rename = "type")]
    pub direction: Direction,
}

/// A ledger transaction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub serial_number: i64,
    pub date: chrono::NaiveDate,
    pub party_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_note: Option<String>,
    pub type_id: i64,
    pub amount: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Body for creating or updating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: chrono::NaiveDate,
    pub party_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_note: Option<String>,
    pub type_id: i64,
    pub amount: f64,
}

/// The derived outstanding-total aggregate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutstandingTotal {
    pub total: f64,
}

/// Filter parameters accepted by the transactions and outstanding-total
/// endpoints. `None` fields are omitted from the query string.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_start: Option<chrono::NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_end: Option<chrono::NaiveDate>,
}

impl TransactionFilter {
    /// Render the filter as query-string pairs.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(party) = &self.party_filter {
            pairs.push(("party_filter".to_string(), party.clone()));
        }
        if let Some(start) = &self.date_start {
            pairs.push(("date_start".to_string(), start.to_string()));
        }
        if let Some(end) = &self.date_end {
            pairs.push(("date_end".to_string(), end.to_string()));
        }
        pairs
    }
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login_id: String,
    pub password: String,
}

/// Login response: a bearer token plus an advertised lifetime hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in_hours: u64,
}
