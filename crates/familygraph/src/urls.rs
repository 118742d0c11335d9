//! URL construction
//!
//! Builds provider URLs from a [`DomainAlias`] and reconstructs the URL of the
//! page currently being served. The current URL doubles as the OAuth2
//! `redirect_uri`, so the callback parameters the provider appends (`code`,
//! `state`, `error`, `error_description`) are stripped from it.

use std::collections::HashMap;

use url::form_urlencoded;
use url::Url;

use crate::config::DomainMap;
use crate::error::{GraphError, Result};

/// Query segments that never survive into the reconstructed current URL.
const DROP_QUERY_PREFIXES: [&str; 4] = ["code=", "state=", "error=", "error_description="];

/// Logical provider host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainAlias {
    /// The Family Graph REST API.
    Graph,
    /// The accounts server hosting the OAuth2 endpoints.
    Accounts,
    /// The public web site.
    Www,
}

/// Build `<base><path>[?<query>]` for a provider host.
///
/// A leading slash on `path` is ignored so that `"/me"` and `"me"` resolve to
/// the same URL. Parameters are form-encoded in the order given.
#[must_use]
pub fn build_url(domains: &DomainMap, alias: DomainAlias, path: &str, params: &[(String, String)]) -> String {
    let mut url = domains.base_url(alias);
    url.push_str(path.strip_prefix('/').unwrap_or(path));
    append_query(&mut url, params);
    url
}

/// Append form-encoded `params` to `url`, reusing an existing query string.
pub(crate) fn append_query(url: &mut String, params: &[(String, String)]) {
    if params.is_empty() {
        return;
    }
    let query = encode_pairs(params);
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&query);
}

pub(crate) fn encode_pairs(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new()).extend_pairs(params).finish()
}

/// The inbound request the client is serving
///
/// Carries what a web front end knows about the current page: whether it was
/// served over HTTPS, the `Host` header (possibly with a port) and the raw
/// request URI. Query parameters are parsed from the URI; form fields of a
/// POST can be added with [`CurrentRequest::with_param`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentRequest {
    https: bool,
    host: String,
    request_uri: String,
    params: HashMap<String, String>,
}

impl CurrentRequest {
    /// Describe a request from its scheme flag, host header and request URI.
    pub fn new(https: bool, host: impl Into<String>, request_uri: impl Into<String>) -> Self {
        let request_uri = request_uri.into();
        let params = split_query(&request_uri)
            .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self { https, host: host.into(), request_uri, params }
    }

    /// Describe a request from its absolute URL.
    ///
    /// # Errors
    /// Returns `GraphError::Config` if `url` is not an absolute http(s) URL
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|e| GraphError::Config(format!("Invalid request URL '{url}': {e}")))?;

        let https = match parsed.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(GraphError::Config(format!("Unsupported request scheme: {other}"))),
        };
        let host = parsed
            .host_str()
            .ok_or_else(|| GraphError::Config(format!("Request URL has no host: {url}")))?;
        let host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let request_uri = match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        };

        Ok(Self::new(https, host, request_uri))
    }

    /// Add (or replace) a request parameter, e.g. a POSTed form field.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Value of a request parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Non-empty value of a request parameter.
    pub(crate) fn non_empty_param(&self, name: &str) -> Option<&str> {
        self.param(name).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub const fn is_https(&self) -> bool {
        self.https
    }

    /// URL of the current page without OAuth2 callback parameters
    ///
    /// Keeps the order of the remaining query segments byte for byte and
    /// includes the port only when it differs from the scheme default.
    #[must_use]
    pub fn current_url(&self) -> String {
        let (scheme, default_port) = if self.https { ("https", 443) } else { ("http", 80) };
        let (hostname, port) = split_port(&self.host);

        let without_fragment = self.request_uri.split('#').next().unwrap_or_default();
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_fragment, None),
        };

        let mut url = format!("{scheme}://{hostname}");
        if let Some(port) = port.filter(|p| *p != default_port) {
            url.push(':');
            url.push_str(&port.to_string());
        }
        url.push_str(path);

        if let Some(query) = query {
            let retained: Vec<&str> = query
                .split('&')
                .filter(|segment| !DROP_QUERY_PREFIXES.iter().any(|prefix| segment.starts_with(prefix)))
                .collect();
            if !retained.is_empty() {
                url.push('?');
                url.push_str(&retained.join("&"));
            }
        }

        url
    }
}

/// Query part of a request URI, if any (fragment excluded).
fn split_query(request_uri: &str) -> Option<&str> {
    let without_fragment = request_uri.split('#').next()?;
    without_fragment.split_once('?').map(|(_, query)| query).filter(|q| !q.is_empty())
}

/// Split `host[:port]`, leaving bracketed IPv6 literals intact.
fn split_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            if name.contains(':') && !name.ends_with(']') {
                // bare IPv6 literal without brackets
                return (host, None);
            }
            port.parse::<u16>().map_or((host, None), |p| (name, Some(p)))
        }
        _ => (host, None),
    }
}
