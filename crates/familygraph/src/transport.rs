//! HTTP transport
//!
//! Sends one request and turns the response body into JSON. The HTTP status is
//! not consulted: the provider reports failures in the body, so a non-2xx
//! response with a JSON body is classified exactly like a 200.
//!
//! Outcomes:
//! - no response at all → [`GraphError::Transport`]
//! - body is not a JSON document → [`GraphError::Parse`]
//! - JSON object with an `error` field → [`GraphError::Protocol`]
//! - anything else → the decoded value

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Method};
use serde_json::Value;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{GraphError, Result};
use crate::urls::append_query;

/// JSON-over-HTTP transport.
#[derive(Debug, Clone)]
pub struct Transport {
    client: ReqwestClient,
}

impl Transport {
    /// Start building a new transport.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    /// Build a transport from configuration.
    ///
    /// # Errors
    /// Returns `GraphError::Config` if the HTTP client cannot be constructed
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Self::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
    }

    /// Perform a request and decode the JSON response
    ///
    /// For `GET`, `params` are appended to the URL (joined with `&` when it
    /// already has a query). For any other method they are sent as a
    /// form-encoded body. `headers` are sent as given.
    ///
    /// # Errors
    /// Returns `Transport`, `Parse` or `Protocol` errors as described in the
    /// module documentation
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        headers: HeaderMap,
    ) -> Result<Value> {
        let mut url = url.to_string();
        let builder = if method == Method::GET {
            append_query(&mut url, params);
            self.client.get(&url)
        } else {
            let builder = self.client.request(method.clone(), &url);
            if params.is_empty() {
                builder
            } else {
                builder.form(params)
            }
        };

        let builder = builder.headers(headers);

        debug!(%method, %url, "sending HTTP request");

        let response = builder.send().await.map_err(|err| {
            debug!(%method, %url, error = %err, "HTTP request failed");
            GraphError::from(err)
        })?;

        let status = response.status();
        debug!(%method, %url, %status, "received HTTP response");

        let body = response.text().await?;
        decode_body(&body)
    }
}

/// Headers carrying `token` as a bearer credential; empty for no token.
///
/// # Errors
/// Returns `GraphError::Config` if the token cannot be sent as a header value
pub fn bearer_headers(token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GraphError::Config("access token is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Classify a response body.
///
/// # Errors
/// Returns `Parse` for a body that is not JSON (or is JSON `null`) and
/// `Protocol` for a payload carrying an `error` field
pub fn decode_body(body: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(body).map_err(|_| GraphError::parse(body))?;

    if value.is_null() {
        return Err(GraphError::parse(body));
    }

    if let Some(err) = GraphError::from_payload(&value) {
        return Err(err);
    }

    Ok(value)
}

/// Builder for [`Transport`].
#[derive(Debug)]
pub struct TransportBuilder {
    connect_timeout: Duration,
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            connect_timeout: Duration::from_secs(defaults.connect_timeout_secs),
            timeout: Duration::from_secs(defaults.timeout_secs),
            user_agent: Some(defaults.user_agent),
        }
    }
}

impl TransportBuilder {
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Total time allowed for one request, including reading the body.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the transport. Responses are transparently decompressed
    /// (gzip, deflate, brotli).
    ///
    /// # Errors
    /// Returns `GraphError::Config` if the HTTP client cannot be constructed
    pub fn build(self) -> Result<Transport> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true);

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|e| GraphError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Transport { client })
    }
}
