//! Fire-and-forget git audit event reporting.
//!
//! Only transport and classification failures surface to the caller; a
//! successful acknowledgement carries no payload and is discarded.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ApiClient;
use crate::config::EndpointConfig;
use crate::error::ApiError;
use crate::response;

const URI: &str = "/api/v4/internal/shellhorse/git_audit_event";

/// The audit record covers any ref change for read-only commands.
const CHANGES_ANY: &str = "_any";

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// The git transport command being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitCommandKind {
    #[serde(rename = "git-upload-pack")]
    UploadPack,
    #[serde(rename = "git-receive-pack")]
    ReceivePack,
    #[serde(rename = "git-upload-archive")]
    UploadArchive,
}

/// Packfile negotiation statistics reported by the git service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackfileNegotiationStatistics {
    #[serde(default)]
    pub payload_size: i64,
    #[serde(default)]
    pub packets: i64,
    #[serde(default)]
    pub caps: Vec<String>,
    #[serde(default)]
    pub wants: i64,
    #[serde(default)]
    pub haves: i64,
    #[serde(default)]
    pub shallows: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Serialize)]
struct RequestBody<'a> {
    action: GitCommandKind,
    protocol: &'a str,
    gl_repository: &'a str,
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    packfile_stats: Option<&'a PackfileNegotiationStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_ip: Option<String>,
    changes: &'a str,
}

// ---------------------------------------------------------------------------
// Remote address helper
// ---------------------------------------------------------------------------

/// Reduce a session remote address to a bare IP for the `check_ip` field.
///
/// The address may arrive as a plain IP (from the SSH connection
/// environment) or as an `ip:port` pair (from the PROXY protocol); anything
/// that does not parse as the latter is passed through unchanged.
pub fn parse_check_ip(remote_addr: &str) -> String {
    match remote_addr.parse::<std::net::SocketAddr>() {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => remote_addr.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for reporting git audit events.
pub struct GitAuditEventClient {
    api: Arc<ApiClient>,
}

impl GitAuditEventClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Build a client with its own transport from the endpoint configuration.
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(ApiClient::new(config)?)))
    }

    /// Report one git command execution over SSH.
    ///
    /// `remote_addr` is the session's remote address as seen by the edge
    /// process; it is reduced to a bare IP before being sent.
    pub async fn audit(
        &self,
        username: &str,
        action: GitCommandKind,
        repo: &str,
        packfile_stats: Option<&PackfileNegotiationStatistics>,
        remote_addr: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = RequestBody {
            action,
            protocol: "ssh",
            gl_repository: repo,
            username,
            packfile_stats,
            check_ip: remote_addr
                .filter(|addr| !addr.is_empty())
                .map(parse_check_ip),
            changes: CHANGES_ANY,
        };

        let raw = self.api.post(URI, &body).await?;
        // Any success payload is discarded; classification failures still
        // surface.
        response::classify::<serde_json::Value>(&raw)?;
        debug!(username, repo, ?action, "git audit event reported");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn command_kind_serializes_to_git_command_names() {
        assert_eq!(
            serde_json::to_value(GitCommandKind::UploadPack).unwrap(),
            json!("git-upload-pack")
        );
        assert_eq!(
            serde_json::to_value(GitCommandKind::ReceivePack).unwrap(),
            json!("git-receive-pack")
        );
        assert_eq!(
            serde_json::to_value(GitCommandKind::UploadArchive).unwrap(),
            json!("git-upload-archive")
        );
    }

    #[test]
    fn check_ip_strips_port() {
        assert_eq!(parse_check_ip("10.1.2.3:4242"), "10.1.2.3");
        assert_eq!(parse_check_ip("[2001:db8::1]:4242"), "2001:db8::1");
    }

    #[test]
    fn check_ip_passes_bare_addresses_through() {
        assert_eq!(parse_check_ip("10.1.2.3"), "10.1.2.3");
        assert_eq!(parse_check_ip("not-an-address"), "not-an-address");
    }

    #[tokio::test]
    async fn audit_posts_expected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(URI))
            .and(body_json(json!({
                "action": "git-upload-pack",
                "protocol": "ssh",
                "gl_repository": "project-1",
                "username": "jane-doe",
                "packfile_stats": {
                    "payload_size": 4096,
                    "packets": 2,
                    "caps": ["side-band-64k"],
                    "wants": 1,
                    "haves": 0,
                    "shallows": 0,
                },
                "check_ip": "10.1.2.3",
                "changes": "_any",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = EndpointConfig::with_base_url(server.uri());
        let client = GitAuditEventClient::from_config(&config).unwrap();

        let stats = PackfileNegotiationStatistics {
            payload_size: 4096,
            packets: 2,
            caps: vec!["side-band-64k".to_string()],
            wants: 1,
            ..Default::default()
        };
        client
            .audit(
                "jane-doe",
                GitCommandKind::UploadPack,
                "project-1",
                Some(&stats),
                Some("10.1.2.3:4242"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn audit_omits_optional_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(URI))
            .and(body_json(json!({
                "action": "git-upload-archive",
                "protocol": "ssh",
                "gl_repository": "project-2",
                "username": "jane-doe",
                "changes": "_any",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = EndpointConfig::with_base_url(server.uri());
        let client = GitAuditEventClient::from_config(&config).unwrap();

        client
            .audit(
                "jane-doe",
                GitCommandKind::UploadArchive,
                "project-2",
                None,
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn audit_surfaces_classified_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(URI))
            .respond_with(
                ResponseTemplate::new(403).set_body_string(r#"{"message":"Not allowed!"}"#),
            )
            .mount(&server)
            .await;

        let config = EndpointConfig::with_base_url(server.uri());
        let client = GitAuditEventClient::from_config(&config).unwrap();

        let err = client
            .audit(
                "jane-doe",
                GitCommandKind::UploadPack,
                "project-1",
                None,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not allowed!");
    }
}
