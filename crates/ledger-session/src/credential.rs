//! The session credential.

use serde::{Deserialize, Serialize};

/// An opaque bearer token representing an authenticated session.
///
/// The lifetime hint comes from the login response and is informational
/// only: expiry is discovered reactively when the server rejects a request,
/// never predicted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The bearer token value.
    pub token: String,
    /// Advertised token lifetime from the login response, in hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_hours: Option<u64>,
}

impl Credential {
    /// Create a credential from a bare token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_in_hours: None,
        }
    }

    /// Create a credential with a lifetime hint.
    pub fn with_lifetime_hint(token: impl Into<String>, hours: u64) -> Self {
        Self {
            token: token.into(),
            expires_in_hours: Some(hours),
        }
    }
}
