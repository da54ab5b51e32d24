//! Typed endpoint helpers over the opaque request core.
//!
//! Collection routes keep their trailing slash: the server answers the
//! bare path with a redirect, and the redirect drops the Authorization
//! header.

use crate::{ApiClient, ApiResult};
use ledger_protocol_types::{
    NewParty, NewTransaction, NewTransactionType, OutstandingTotal, Party, Transaction,
    TransactionFilter, TransactionType,
};

impl ApiClient {
    /// Fetch all parties.
    pub async fn parties(&self) -> ApiResult<Vec<Party>> {
        let value = self.get("/parties/", &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch a single party.
    pub async fn party(&self, id: i64) -> ApiResult<Party> {
        let value = self.get(&format!("/parties/{}", id), &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Create a party.
    pub async fn create_party(&self, party: &NewParty) -> ApiResult<Party> {
        let value = self.post("/parties/", &serde_json::to_value(party)?).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Update a party.
    pub async fn update_party(&self, id: i64, party: &NewParty) -> ApiResult<Party> {
        let value = self
            .put(&format!("/parties/{}", id), &serde_json::to_value(party)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete a party.
    pub async fn delete_party(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("/parties/{}", id)).await?;
        Ok(())
    }

    /// Search parties by name.
    pub async fn search_parties(&self, term: &str) -> ApiResult<Vec<Party>> {
        let value = self.get(&format!("/parties/search/{}", term), &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch all transaction types.
    pub async fn transaction_types(&self) -> ApiResult<Vec<TransactionType>> {
        let value = self.get("/transaction-types/", &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch a single transaction type.
    pub async fn transaction_type(&self, id: i64) -> ApiResult<TransactionType> {
        let value = self.get(&format!("/transaction-types/{}", id), &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Create a transaction type.
    pub async fn create_transaction_type(
        &self,
        tt: &NewTransactionType,
    ) -> ApiResult<TransactionType> {
        let value = self
            .post("/transaction-types/", &serde_json::to_value(tt)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Update a transaction type.
    pub async fn update_transaction_type(
        &self,
        id: i64,
        tt: &NewTransactionType,
    ) -> ApiResult<TransactionType> {
        let value = self
            .put(
                &format!("/transaction-types/{}", id),
                &serde_json::to_value(tt)?,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete a transaction type.
    pub async fn delete_transaction_type(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("/transaction-types/{}", id)).await?;
        Ok(())
    }

    /// Fetch transactions matching a filter.
    pub async fn transactions(&self, filter: &TransactionFilter) -> ApiResult<Vec<Transaction>> {
        let value = self.get("/transactions/", &filter.to_query()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch a single transaction.
    pub async fn transaction(&self, id: i64) -> ApiResult<Transaction> {
        let value = self.get(&format!("/transactions/{}", id), &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Create a transaction.
    pub async fn create_transaction(&self, tx: &NewTransaction) -> ApiResult<Transaction> {
        let value = self
            .post("/transactions/", &serde_json::to_value(tx)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Update a transaction.
    pub async fn update_transaction(&self, id: i64, tx: &NewTransaction) -> ApiResult<Transaction> {
        let value = self
            .put(&format!("/transactions/{}", id), &serde_json::to_value(tx)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete a transaction.
    pub async fn delete_transaction(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("/transactions/{}", id)).await?;
        Ok(())
    }

    /// Fetch the outstanding total, optionally filtered.
    pub async fn outstanding_total(&self, filter: &TransactionFilter) -> ApiResult<OutstandingTotal> {
        let value = self
            .get("/transactions/outstanding/total", &filter.to_query())
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}
