//! HTTP transport
//!
//! The dispatcher talks to the network through the [`Transport`] trait so the
//! admission and retry logic can be exercised against fakes. The production
//! implementation is [`ReqwestTransport`], which injects the session cookie
//! into every request.

use crate::config::SessionConfig;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// A response that reached us, whatever its status
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// No response was received (connection refused, reset, timeout, DNS failure)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new("request timeout")
        } else if e.is_connect() {
            Self::new(format!("connection failed: {}", e))
        } else {
            Self::new(e.to_string())
        }
    }
}

/// Raw GET transport used by the dispatcher
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET request. Any received response, including 4xx and 5xx,
    /// is returned as `Ok`.
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// Builds an HTTP client that sends the session cookie with every request
///
/// # Arguments
///
/// * `session` - The session configuration (cookie and user agent)
/// * `timeout` - Overall per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(LedgerError)` - The cookie is not a valid header value, or the
///   client could not be built
pub fn build_http_client(session: &SessionConfig, timeout: Duration) -> crate::Result<Client> {
    let mut headers = HeaderMap::new();
    if !session.cookie.is_empty() {
        let mut cookie = HeaderValue::from_str(&session.cookie).map_err(|e| {
            ConfigError::Validation(format!("session cookie is not a valid header value: {}", e))
        })?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);
    }

    let client = Client::builder()
        .user_agent(session.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// [`Transport`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(session: &SessionConfig, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: build_http_client(session, timeout)?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
