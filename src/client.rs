//! Transport client for the control-plane internal API.
//!
//! Owns the endpoint configuration and performs authenticated JSON requests
//! against either an HTTP(S) base URL (via `reqwest`, which provides the
//! shared connection pool) or a local Unix socket (via a per-call `hyper`
//! http1 handshake).  Both paths drain the response body completely and
//! return a [`RawResponse`] for classification; connection-level failures
//! surface as [`ApiError::Transport`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST, USER_AGENT};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::UnixStream;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::error::ApiError;
use crate::response::RawResponse;

const JSON_CONTENT_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Transport selection
// ---------------------------------------------------------------------------

enum Transport {
    Http {
        client: reqwest::Client,
        base_url: String,
    },
    Unix {
        socket_path: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated transport client, created once from an [`EndpointConfig`]
/// and safe for concurrent use from independent tasks.
///
/// Stateless beyond the underlying connection pool; each call acquires and
/// releases its own connection slot.
pub struct ApiClient {
    transport: Transport,
    secret: Option<String>,
    user_agent: String,
    request_timeout: Duration,
}

impl ApiClient {
    /// Build a client from the endpoint configuration.
    ///
    /// A configured `socket_path` takes precedence over `base_url`.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        config.validate()?;

        let transport = match &config.socket_path {
            Some(path) => Transport::Unix {
                socket_path: path.clone(),
            },
            None => {
                let client = reqwest::Client::builder()
                    .user_agent(&config.user_agent)
                    .timeout(config.request_timeout())
                    .connect_timeout(config.connect_timeout())
                    .build()
                    .context("failed to build http client")?;
                Transport::Http {
                    client,
                    base_url: config.base_url.trim_end_matches('/').to_string(),
                }
            }
        };

        Ok(Self {
            transport,
            secret: config.secret.clone(),
            user_agent: config.user_agent.clone(),
            request_timeout: config.request_timeout(),
        })
    }

    /// Issue a GET against a fixed endpoint path with query parameters.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<RawResponse, ApiError> {
        self.request(http::Method::GET, path, query, None).await
    }

    /// Issue a POST against a fixed endpoint path with a JSON body.
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<RawResponse, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(ApiError::transport)?;
        self.request(http::Method::POST, path, &[], Some(bytes))
            .await
    }

    async fn request(
        &self,
        method: http::Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, ApiError> {
        let raw = match &self.transport {
            Transport::Http { client, base_url } => {
                self.http_request(client, base_url, method.clone(), path, query, body)
                    .await
            }
            Transport::Unix { socket_path } => {
                let result = tokio::time::timeout(
                    self.request_timeout,
                    self.unix_request(socket_path, method.clone(), path, query, body),
                )
                .await;
                match result {
                    Ok(raw) => raw,
                    Err(_) => Err(anyhow::anyhow!(
                        "request timed out after {:?}",
                        self.request_timeout
                    )),
                }
            }
        }
        .map_err(ApiError::Transport)?;

        debug!(%method, path, status = raw.status, "internal API response");
        Ok(raw)
    }

    // -- HTTP(S) path -------------------------------------------------------

    async fn http_request(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        method: http::Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse> {
        let url = format!("{base_url}{path}");
        let mut request = client
            .request(method, &url)
            .header(ACCEPT, JSON_CONTENT_TYPE);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(secret) = &self.secret {
            request = request.header(AUTHORIZATION, format!("Bearer {secret}"));
        }
        if let Some(bytes) = body {
            request = request.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(bytes);
        }

        let response = request
            .send()
            .await
            .context("internal API request failed")?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .context("failed to read internal API response body")?;

        Ok(RawResponse { status, body })
    }

    // -- Unix socket path ---------------------------------------------------

    async fn unix_request(
        &self,
        socket_path: &PathBuf,
        method: http::Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse> {
        let stream = UnixStream::connect(socket_path)
            .await
            .with_context(|| format!("failed to connect to {}", socket_path.display()))?;

        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .context("http handshake over unix socket failed")?;

        // The connection task finishes when the request completes or the
        // socket closes; errors there also surface through `send_request`.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "unix socket connection closed with error");
            }
        });

        let mut builder = http::Request::builder()
            .method(method)
            .uri(path_and_query(path, query)?)
            .header(HOST, "localhost")
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, JSON_CONTENT_TYPE);
        if let Some(secret) = &self.secret {
            builder = builder.header(AUTHORIZATION, format!("Bearer {secret}"));
        }
        let request = match body {
            Some(bytes) => builder
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(Full::new(Bytes::from(bytes))),
            None => builder.body(Full::new(Bytes::new())),
        }
        .context("failed to build unix socket request")?;

        let response = sender
            .send_request(request)
            .await
            .context("internal API request over unix socket failed")?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .context("failed to read internal API response body")?
            .to_bytes();

        Ok(RawResponse { status, body })
    }
}

/// Encode a path plus query parameters into a request target, with standard
/// form encoding for the parameter values.
fn path_and_query(path: &str, query: &[(&str, &str)]) -> Result<String> {
    if query.is_empty() {
        return Ok(path.to_string());
    }
    let url = reqwest::Url::parse_with_params(&format!("http://localhost{path}"), query)
        .context("failed to encode query parameters")?;
    match url.query() {
        Some(q) => Ok(format!("{}?{}", url.path(), q)),
        None => Ok(url.path().to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
