//! Error types for the Family Graph client
//!
//! Every fallible operation in this crate returns [`GraphError`]. The enum is
//! closed: callers match on it (or on [`ErrorKind`]) to tell a broken network
//! apart from an unparseable body or a structured error reported by the
//! provider itself.
//!
//! Protocol errors keep the provider's error code (`invalid_token`,
//! `invalid_grant`, a REST status such as `403`, ...) together with the full
//! decoded payload so callers can inspect fields this crate does not model.

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters of a response body kept in parse errors.
pub const BODY_EXCERPT_LIMIT: usize = 512;

/// Provider error code that invalidates the whole session.
pub const INVALID_TOKEN: &str = "invalid_token";

/// Message used when the provider omits `error_description`.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Protocol error codes that mean the caller has to sign in again.
const LOGIN_REQUIRED_TYPES: &[&str] = &[
    "invalid_token",
    "missing_token",
    "expired_token",
    "invalid_grant",
    "invalid_client",
    "unauthorized_client",
    "401",
    "403",
];

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Broad classification of a [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never produced a response (DNS, TLS, connect, timeout).
    Transport,
    /// A response arrived but its body was not a JSON document.
    Parse,
    /// The provider answered with a structured `error` payload.
    Protocol,
    /// The session store failed to read or write.
    Store,
    /// Invalid configuration or HTTP client construction failure.
    Config,
}

impl ErrorKind {
    /// Stable label used in logs and as the error type of non-protocol errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::Protocol => "protocol",
            Self::Store => "store",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Family Graph client errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// The request never produced a response.
    #[error("transport: {}{message}", fmt_code(.code))]
    Transport {
        /// Client error text followed by its root cause.
        message: String,
        /// OS error number of the underlying I/O failure, if any.
        code: Option<i32>,
    },

    /// The response body could not be decoded.
    #[error("parse: {message}")]
    Parse {
        /// What failed, with an excerpt of the body.
        message: String,
    },

    /// The provider reported an error in its JSON payload.
    #[error("{error_type}: {message}")]
    Protocol {
        /// Text form of the payload's `error` field.
        error_type: String,
        /// The payload's `error_description`, or a generic message.
        message: String,
        /// The full decoded payload.
        raw: Value,
    },

    /// The session store failed; carries the store's own message.
    #[error("store: {0}")]
    Store(String),

    /// Invalid configuration, or the HTTP client could not be built.
    #[error("config: {0}")]
    Config(String),
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map(|c| format!("{c}: ")).unwrap_or_default()
}

impl GraphError {
    /// Build a parse error from the raw body, keeping a bounded excerpt.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let excerpt: String = body.chars().take(BODY_EXCERPT_LIMIT).collect();
        let truncated = body.chars().nth(BODY_EXCERPT_LIMIT).is_some();
        Self::Parse {
            message: format!(
                "Failed to parse response as JSON: {excerpt}{}",
                if truncated { "..." } else { "" }
            ),
        }
    }

    /// Build a protocol error from a decoded payload carrying an `error` field.
    ///
    /// Returns `None` when the payload has no (non-null) `error` entry.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let error = payload.get("error").filter(|v| !v.is_null())?;
        let message = payload
            .get("error_description")
            .filter(|v| !v.is_null())
            .map_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string(), value_text);

        Some(Self::Protocol { error_type: value_text(error), message, raw: payload.clone() })
    }

    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Store(_) => ErrorKind::Store,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Provider error code for protocol errors, otherwise the kind label.
    #[must_use]
    pub fn error_type(&self) -> &str {
        match self {
            Self::Protocol { error_type, .. } => error_type,
            other => other.kind().as_str(),
        }
    }

    /// OS error number attached to a transport error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Transport { code, .. } => *code,
            _ => None,
        }
    }

    /// Decoded provider payload for protocol errors.
    #[must_use]
    pub const fn raw_data(&self) -> Option<&Value> {
        match self {
            Self::Protocol { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Whether the provider rejected the access token itself.
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::Protocol { error_type, .. } if error_type == INVALID_TOKEN)
    }

    /// Whether recovering from this error requires a fresh login.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Protocol { error_type, .. } if LOGIN_REQUIRED_TYPES.contains(&error_type.as_str())
        )
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        let code = io_cause(&err).and_then(std::io::Error::raw_os_error);
        let message = match root_cause(&err) {
            Some(cause) => format!("{err}: {cause}"),
            None => err.to_string(),
        };
        Self::Transport { message, code }
    }
}

/// First `std::io::Error` in the source chain of `err`.
fn io_cause<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a std::io::Error> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        source = cause.source();
    }
    None
}

/// Innermost error in the source chain of `err`, if it has one.
fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a (dyn StdError + 'static)> {
    let mut root = err.source()?;
    while let Some(next) = root.source() {
        root = next;
    }
    Some(root)
}

/// Text form of a JSON value: strings verbatim, anything else as JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error.
    use serde_json::json;

    use super::*;

    #[test]
    fn protocol_error_from_payload_keeps_type_message_and_raw() {
        let payload = json!({"error": "invalid_request", "error_description": "Missing id"});
        let err = GraphError::from_payload(&payload).expect("protocol error");

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.error_type(), "invalid_request");
        assert_eq!(err.to_string(), "invalid_request: Missing id");
        assert_eq!(err.raw_data(), Some(&payload));
    }

    #[test]
    fn missing_description_defaults_to_unknown_error() {
        let err = GraphError::from_payload(&json!({"error": "server_error"})).expect("error");
        assert_eq!(err.to_string(), "server_error: Unknown error");
    }

    #[test]
    fn numeric_error_codes_are_rendered_as_text() {
        let err = GraphError::from_payload(&json!({"error": 403, "error_description": "Forbidden"}))
            .expect("error");
        assert_eq!(err.error_type(), "403");
        assert!(err.requires_login());
    }

    #[test]
    fn payload_without_error_is_not_an_error() {
        assert!(GraphError::from_payload(&json!({"id": "individual-1"})).is_none());
        assert!(GraphError::from_payload(&json!({"error": null})).is_none());
        assert!(GraphError::from_payload(&json!(["error"])).is_none());
    }

    #[test]
    fn invalid_token_is_detected() {
        let err = GraphError::from_payload(&json!({"error": "invalid_token"})).expect("error");
        assert!(err.is_invalid_token());
        assert!(err.requires_login());

        let other = GraphError::from_payload(&json!({"error": "invalid_request"})).expect("error");
        assert!(!other.is_invalid_token());
        assert!(!other.requires_login());
    }

    #[test]
    fn parse_error_caps_the_body_excerpt() {
        let body = "x".repeat(BODY_EXCERPT_LIMIT * 3);
        let GraphError::Parse { message } = GraphError::parse(&body) else {
            panic!("expected parse error");
        };
        assert!(message.ends_with("..."));
        assert!(message.len() < BODY_EXCERPT_LIMIT + 64);
    }

    #[test]
    fn transport_display_includes_os_error_code_when_present() {
        let err = GraphError::Transport { message: "connection refused".into(), code: Some(111) };
        assert_eq!(err.to_string(), "transport: 111: connection refused");
        assert_eq!(err.code(), Some(111));
        assert_eq!(err.error_type(), "transport");

        let err = GraphError::Transport { message: "operation timed out".into(), code: None };
        assert_eq!(err.to_string(), "transport: operation timed out");
    }

    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("client error (Connect)")
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn source_chain_yields_io_cause_and_root() {
        let err = Wrapped(std::io::Error::from_raw_os_error(111));

        let io = io_cause(&err).expect("io cause");
        assert_eq!(io.raw_os_error(), Some(111));

        let root = root_cause(&err).expect("root cause");
        assert_eq!(root.to_string(), io.to_string());

        let plain = std::io::Error::other("no source");
        assert!(io_cause(&plain).is_none());
        assert!(root_cause(&plain).is_none());
    }
}
