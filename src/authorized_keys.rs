//! Authorized-keys lookup against the internal API.

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::config::EndpointConfig;
use crate::error::ApiError;
use crate::response;

const URI: &str = "/api/v4/internal/authorized_keys";

/// A registered public key and its database id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizedKey {
    pub id: u64,
    pub key: String,
}

/// Client for looking up registered SSH public keys.
pub struct AuthorizedKeysClient {
    api: Arc<ApiClient>,
}

impl AuthorizedKeysClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Build a client with its own transport from the endpoint configuration.
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(ApiClient::new(config)?)))
    }

    /// Look up a public key by its full key material.
    ///
    /// Returns `Ok(None)` when the backend answers `null`, meaning the key
    /// is not registered.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<AuthorizedKey>, ApiError> {
        let raw = self.api.get(URI, &[("key", key)]).await?;
        response::classify(&raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
