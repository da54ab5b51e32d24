//! Resolves query identities to ledger API reads.

use futures_util::future::BoxFuture;
use ledger_api::{ApiClient, ApiError};
use ledger_cache::{queries, FetchFailure, QueryFetcher, QueryKey};
use serde_json::Value;

/// `QueryFetcher` implementation over the REST transport.
///
/// Every engine read is an idempotent GET and goes through the transport's
/// single-retry rule.
pub struct ApiFetcher {
    api: ApiClient,
}

impl ApiFetcher {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Map a query identity to its endpoint path.
    fn path_for(key: &QueryKey) -> String {
        match key.name.as_str() {
            queries::PARTIES => "/parties/".to_string(),
            queries::TRANSACTION_TYPES => "/transaction-types/".to_string(),
            queries::TRANSACTIONS => "/transactions/".to_string(),
            queries::OUTSTANDING_TOTAL => "/transactions/outstanding/total".to_string(),
            other => format!("/{}/", other),
        }
    }

    fn map_error(error: ApiError) -> FetchFailure {
        match error {
            ApiError::Unauthorized => FetchFailure::Unauthorized,
            ApiError::Server { status, body } => FetchFailure::Rejected {
                status,
                message: body,
            },
            other => FetchFailure::Network(other.to_string()),
        }
    }
}

impl QueryFetcher for ApiFetcher {
    fn fetch(&self, key: &QueryKey) -> BoxFuture<'static, Result<Value, FetchFailure>> {
        let api = self.api.clone();
        let path = Self::path_for(key);
        let query: Vec<(String, String)> = key
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Box::pin(async move {
            api.get_retry_once(&path, &query)
                .await
                .map_err(Self::map_error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_map_to_ledger_endpoints() {
        assert_eq!(ApiFetcher::path_for(&QueryKey::new("parties")), "/parties/");
        assert_eq!(
            ApiFetcher::path_for(&QueryKey::new("transaction-types")),
            "/transaction-types/"
        );
        assert_eq!(
            ApiFetcher::path_for(&QueryKey::new("transactions")),
            "/transactions/"
        );
        assert_eq!(
            ApiFetcher::path_for(&QueryKey::new("outstanding-total")),
            "/transactions/outstanding/total"
        );
    }

    #[test]
    fn test_unknown_names_map_to_collection_path() {
        assert_eq!(ApiFetcher::path_for(&QueryKey::new("audit-log")), "/audit-log/");
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ApiFetcher::map_error(ApiError::Unauthorized),
            FetchFailure::Unauthorized
        );
        assert_eq!(
            ApiFetcher::map_error(ApiError::Server {
                status: 500,
                body: "boom".to_string()
            }),
            FetchFailure::Rejected {
                status: 500,
                message: "boom".to_string()
            }
        );
    }
}
