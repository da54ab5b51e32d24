//! The REST client core.

use crate::{ApiError, ApiResult};
use ledger_protocol_types::{LoginRequest, TokenResponse};
use ledger_session::{Credential, SessionStore};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

/// REST client for the ledger API.
///
/// Every outbound call consults the session store and attaches the bearer
/// token when a credential is present; an absent credential sends the call
/// unauthenticated (only the login endpoint is expected to succeed then).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Arguments
    /// * `base_url` - API base, e.g. `https://ledger.example.com/api/v1`
    /// * `timeout` - default per-request timeout
    /// * `session` - the session store credentials are read from
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> ApiResult<Self> {
        let base_url = base_url.into();
        // Validate early; individual requests use string concatenation.
        url::Url::parse(&base_url)?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The session store this client attaches credentials from.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Build the full URL for an API path.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a request and surface the response body as opaque JSON.
    ///
    /// Status handling:
    /// - 2xx: body parsed as JSON (empty body becomes `null`)
    /// - 401: credential cleared through the session store, then
    ///   [`ApiError::Unauthorized`] — the caller still observes the failure
    /// - other 4xx/5xx: [`ApiError::Server`], no retry, no session change
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> ApiResult<serde_json::Value> {
        let url = self.api_url(path);
        let mut builder = self.http.request(method.clone(), url.as_str());

        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(credential) = self.session.credential() {
            builder = builder.header("Authorization", format!("Bearer {}", credential.token));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        tracing::debug!(%method, %url, "Issuing ledger API request");

        let response = builder.send().await?;
        let status = response.status();

        if status.as_u16() == 401 {
            tracing::warn!(%url, "Authorization rejected; ending session");
            self.session.clear_credential();
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, %url, "Ledger API request failed");
            return Err(ApiError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// GET a path.
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> ApiResult<serde_json::Value> {
        self.request(Method::GET, path, query, None).await
    }

    /// GET with the refetch retry rule: exactly one immediate retry on a
    /// transport-level failure. Server rejections are never retried.
    pub async fn get_retry_once(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ApiResult<serde_json::Value> {
        match self.request(Method::GET, path, query, None).await {
            Err(ApiError::Transport(e)) => {
                tracing::warn!(error = %e, path, "Read failed at transport level; retrying once");
                self.request(Method::GET, path, query, None).await
            }
            other => other,
        }
    }

    /// POST a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> ApiResult<serde_json::Value> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// PUT a JSON body.
    pub async fn put(&self, path: &str, body: &serde_json::Value) -> ApiResult<serde_json::Value> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    /// DELETE a path.
    pub async fn delete(&self, path: &str) -> ApiResult<serde_json::Value> {
        self.request(Method::DELETE, path, &[], None).await
    }

    /// Log in and install the returned credential.
    ///
    /// A 401 here means wrong credentials, not an ended session; the session
    /// store treats clearing an absent credential as a no-op, so no spurious
    /// session-ended broadcast fires.
    pub async fn login(&self, login_id: &str, password: &str) -> ApiResult<TokenResponse> {
        let body = serde_json::to_value(LoginRequest {
            login_id: login_id.to_string(),
            password: password.to_string(),
        })?;

        let value = self.post("/auth/login", &body).await?;
        let token: TokenResponse = serde_json::from_value(value)?;

        self.session.set_credential(Credential::with_lifetime_hint(
            token.access_token.clone(),
            token.expires_in_hours,
        ));

        tracing::info!(
            expires_in_hours = token.expires_in_hours,
            "Logged in to ledger API"
        );
        Ok(token)
    }
}
