//! Personal access token issuance against the internal API.
//!
//! The backend reports application-level failure through an embedded
//! `success` flag on an HTTP 200 response; the classifier turns that into a
//! domain error carrying the embedded message, so callers never have to
//! inspect the flag themselves.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::config::EndpointConfig;
use crate::error::ApiError;
use crate::response;

const URI: &str = "/api/v4/internal/personal_access_token";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who the token is requested for.
///
/// The wire shape has two mutually exclusive fields (`key_id` /
/// `username`); modeling the pair as a tagged variant makes "both" and
/// "neither" unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    KeyId(String),
    Username(String),
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RequestBody<'a> {
    #[serde(flatten)]
    identity: &'a Identity,
    name: &'a str,
    scopes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
}

/// An issued token: the granted scope set preserves the backend's order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersonalAccessToken {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for requesting personal access tokens.
pub struct PersonalAccessTokenClient {
    api: Arc<ApiClient>,
}

impl PersonalAccessTokenClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Build a client with its own transport from the endpoint configuration.
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(ApiClient::new(config)?)))
    }

    /// Request a token for `identity` with the given name and scope set.
    ///
    /// `expires_in` is a number of days; `None` leaves expiry to the
    /// backend's policy.  The operation's success shape is mandatory, so an
    /// empty success response classifies as a parse failure.
    pub async fn get_personal_access_token(
        &self,
        identity: &Identity,
        name: &str,
        scopes: &[String],
        expires_in: Option<u64>,
    ) -> Result<PersonalAccessToken, ApiError> {
        let body = RequestBody {
            identity,
            name,
            scopes,
            expires_in,
        };
        let raw = self.api.post(URI, &body).await?;
        response::classify(&raw)?.ok_or(ApiError::Parse)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
