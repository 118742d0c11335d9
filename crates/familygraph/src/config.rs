//! Client configuration
//!
//! Loads the OAuth2 application credentials and endpoint settings from
//! environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `FAMILYGRAPH_CLIENT_ID`: OAuth2 client id (required)
//! - `FAMILYGRAPH_CLIENT_SECRET`: OAuth2 client secret (required)
//! - `FAMILYGRAPH_GRAPH_URL`: Base URL of the Family Graph API
//! - `FAMILYGRAPH_ACCOUNTS_URL`: Base URL of the accounts (OAuth2) server
//! - `FAMILYGRAPH_WWW_URL`: Base URL of the public web site
//! - `FAMILYGRAPH_CONNECT_TIMEOUT`: Connect timeout in seconds
//! - `FAMILYGRAPH_TIMEOUT`: Total request timeout in seconds
//! - `FAMILYGRAPH_USER_AGENT`: User agent sent with every request
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./familygraph.json` or `./familygraph.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::urls::DomainAlias;

/// Default base URL of the Family Graph API.
pub const DEFAULT_GRAPH_URL: &str = "https://familygraph.myheritage.com/";
/// Default base URL of the accounts (OAuth2) server.
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.myheritage.com/";
/// Default base URL of the public web site.
pub const DEFAULT_WWW_URL: &str = "https://www.myheritage.com/";

/// Application configuration for a [`GraphClient`](crate::GraphClient).
#[derive(Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// OAuth2 client id issued to the application.
    pub client_id: String,
    /// OAuth2 client secret. Never serialized.
    #[serde(skip_serializing)]
    pub client_secret: String,
    #[serde(default)]
    pub domains: DomainMap,
    #[serde(default)]
    pub http: HttpConfig,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("domains", &self.domains)
            .field("http", &self.http)
            .finish()
    }
}

impl GraphConfig {
    /// Configuration with production endpoints and default HTTP settings.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            domains: DomainMap::default(),
            http: HttpConfig::default(),
        }
    }

    /// Replace the endpoint map.
    #[must_use]
    pub fn with_domains(mut self, domains: DomainMap) -> Self {
        self.domains = domains;
        self
    }

    /// Check that the credentials are present.
    ///
    /// # Errors
    /// Returns `GraphError::Config` if the client id or secret is empty
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(GraphError::Config("client_id must not be empty".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(GraphError::Config("client_secret must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Base URLs of the three provider hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMap {
    pub graph: String,
    pub accounts: String,
    pub www: String,
}

impl Default for DomainMap {
    fn default() -> Self {
        Self {
            graph: DEFAULT_GRAPH_URL.to_string(),
            accounts: DEFAULT_ACCOUNTS_URL.to_string(),
            www: DEFAULT_WWW_URL.to_string(),
        }
    }
}

impl DomainMap {
    /// Point every alias at the same base URL (test servers, proxies).
    pub fn uniform(base: impl Into<String>) -> Self {
        let base = base.into();
        Self { graph: base.clone(), accounts: base.clone(), www: base }
    }

    /// Base URL for `alias`, always ending with a slash.
    #[must_use]
    pub fn base_url(&self, alias: DomainAlias) -> String {
        let base = match alias {
            DomainAlias::Graph => &self.graph,
            DomainAlias::Accounts => &self.accounts,
            DomainAlias::Www => &self.www,
        };
        if base.ends_with('/') {
            base.clone()
        } else {
            format!("{base}/")
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            timeout_secs: 60,
            user_agent: format!("familygraph-rust-{}", crate::VERSION),
        }
    }
}

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `GraphError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<GraphConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `GraphError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<GraphConfig> {
    let client_id = env_var("FAMILYGRAPH_CLIENT_ID")?;
    let client_secret = env_var("FAMILYGRAPH_CLIENT_SECRET")?;

    let defaults = DomainMap::default();
    let domains = DomainMap {
        graph: env_or("FAMILYGRAPH_GRAPH_URL", defaults.graph),
        accounts: env_or("FAMILYGRAPH_ACCOUNTS_URL", defaults.accounts),
        www: env_or("FAMILYGRAPH_WWW_URL", defaults.www),
    };

    let defaults = HttpConfig::default();
    let http = HttpConfig {
        connect_timeout_secs: env_u64("FAMILYGRAPH_CONNECT_TIMEOUT", defaults.connect_timeout_secs)?,
        timeout_secs: env_u64("FAMILYGRAPH_TIMEOUT", defaults.timeout_secs)?,
        user_agent: env_or("FAMILYGRAPH_USER_AGENT", defaults.user_agent),
    };

    let config = GraphConfig { client_id, client_secret, domains, http };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `GraphError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<GraphConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GraphError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            GraphError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GraphError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<GraphConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| GraphError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GraphError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(GraphError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["familygraph.json", "familygraph.toml", "config.json", "config.toml"];

    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| GraphError::Config(format!("Missing required environment variable: {key}")))
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| GraphError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
