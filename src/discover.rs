//! User discovery against the internal API.
//!
//! Resolves a key id or username to the owning user record.  Callers that
//! only hold one side of the identity (for example an SSH key id) use this
//! before operations that need the full user.

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::config::EndpointConfig;
use crate::error::ApiError;
use crate::response;

const URI: &str = "/api/v4/internal/discover";

/// The user record a key or username resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveredUser {
    pub user_id: u64,
    pub username: String,
    pub name: String,
}

/// Client for resolving identities to user records.
pub struct DiscoverClient {
    api: Arc<ApiClient>,
}

impl DiscoverClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Build a client with its own transport from the endpoint configuration.
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(ApiClient::new(config)?)))
    }

    /// Resolve a key id to its owning user.  `Ok(None)` means no such user.
    pub async fn get_by_key_id(&self, key_id: &str) -> Result<Option<DiscoveredUser>, ApiError> {
        let raw = self.api.get(URI, &[("key_id", key_id)]).await?;
        response::classify(&raw)
    }

    /// Resolve a username to its user record.  `Ok(None)` means no such user.
    pub async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DiscoveredUser>, ApiError> {
        let raw = self.api.get(URI, &[("username", username)]).await?;
        response::classify(&raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, DiscoverClient) {
        let server = MockServer::start().await;

        let user = serde_json::json!({
            "user_id": 1,
            "username": "jane-doe",
            "name": "Jane Doe",
        });
        Mock::given(method("GET"))
            .and(path(URI))
            .and(query_param("username", "jane-doe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&user))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(URI))
            .and(query_param("key_id", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&user))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(URI))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let config = EndpointConfig::with_base_url(server.uri());
        let client = DiscoverClient::from_config(&config).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn discover_by_username() {
        let (_server, client) = setup().await;

        let user = client.get_by_username("jane-doe").await.unwrap().unwrap();
        assert_eq!(
            user,
            DiscoveredUser {
                user_id: 1,
                username: "jane-doe".to_string(),
                name: "Jane Doe".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn discover_by_key_id() {
        let (_server, client) = setup().await;

        let user = client.get_by_key_id("1").await.unwrap().unwrap();
        assert_eq!(user.user_id, 1);
    }

    #[tokio::test]
    async fn unknown_identity_is_absent() {
        let (_server, client) = setup().await;

        let user = client.get_by_username("nobody").await.unwrap();
        assert!(user.is_none());
    }
}
