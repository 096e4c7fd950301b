use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Endpoint configuration
// ---------------------------------------------------------------------------

/// Immutable description of how to reach the control-plane internal API.
///
/// Built once by the host process (configuration loading itself lives
/// outside this crate) and shared read-only by every client constructed
/// from it.  Exactly one of `base_url` / `socket_path` selects the
/// transport; when both are present the Unix socket wins, matching the
/// behaviour of the edge process this layer serves.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the internal API (e.g. `https://gitlab.example.com`).
    #[serde(default)]
    pub base_url: String,

    /// Path to a local Unix socket serving the internal API.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Shared secret sent as a bearer token on every request.
    #[serde(default)]
    pub secret: Option<String>,

    /// Overall request timeout in seconds (headers + body).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds (TCP + TLS handshake).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    concat!("gitnet/", env!("CARGO_PKG_VERSION")).to_string()
}

impl EndpointConfig {
    /// Config pointing at an HTTP(S) base URL, defaults elsewhere.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            socket_path: None,
            secret: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    /// Config pointing at a local Unix socket, defaults elsewhere.
    pub fn with_socket_path(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: String::new(),
            socket_path: Some(socket_path.into()),
            secret: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Basic sanity checks that cannot be expressed purely with serde.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.base_url.is_empty() || self.socket_path.is_some(),
            "either base_url or socket_path must be set"
        );
        if self.socket_path.is_none() {
            anyhow::ensure!(
                self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
                "base_url must be an http:// or https:// URL, got {:?}",
                self.base_url
            );
        }
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be non-zero"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
