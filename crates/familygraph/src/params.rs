//! API call arguments
//!
//! [`ApiPath`] names what to fetch: one object path (which may carry its own
//! query string) or a batch of object ids. [`ApiParams`] is an insertion
//! ordered parameter map whose values are arbitrary JSON; strings travel as-is
//! and every other value is sent as its JSON text.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Target of an [`api`](crate::GraphClient::api) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiPath {
    /// A single object or connection path, e.g. `me` or `individual-1/events?limit=5`.
    Single(String),
    /// Several object ids fetched in one request.
    Batch(Vec<String>),
}

impl From<&str> for ApiPath {
    fn from(path: &str) -> Self {
        Self::Single(path.to_string())
    }
}

impl From<String> for ApiPath {
    fn from(path: String) -> Self {
        Self::Single(path)
    }
}

impl From<Vec<String>> for ApiPath {
    fn from(ids: Vec<String>) -> Self {
        Self::Batch(ids)
    }
}

impl From<&[&str]> for ApiPath {
    fn from(ids: &[&str]) -> Self {
        Self::Batch(ids.iter().map(|id| (*id).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ApiPath {
    fn from(ids: [&str; N]) -> Self {
        Self::Batch(ids.iter().map(|id| (*id).to_string()).collect())
    }
}

/// Ordered request parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiParams(Map<String, Value>);

impl ApiParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing any previous value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Serialize into wire pairs: strings verbatim, other values as JSON text.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

impl From<Map<String, Value>> for ApiParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ApiParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Split an [`ApiPath`] into the request path and final parameters.
///
/// A batch becomes an empty path plus `ids=<comma joined>`. A single path with
/// an embedded query string has that query merged in: keys the caller passed
/// explicitly win, and a key repeated inside the path query keeps its last
/// value.
pub(crate) fn resolve(path: ApiPath, mut params: ApiParams) -> (String, ApiParams) {
    match path {
        ApiPath::Batch(ids) => {
            params.insert("ids", ids.join(","));
            (String::new(), params)
        }
        ApiPath::Single(path) => match path.split_once('?') {
            Some((bare, query)) => {
                let mut embedded = Map::new();
                for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                    embedded.insert(key.into_owned(), Value::String(value.into_owned()));
                }
                for (key, value) in embedded {
                    if !params.contains_key(&key) {
                        params.0.insert(key, value);
                    }
                }
                (bare.to_string(), params)
            }
            None => (path, params),
        },
    }
}
