//! Client library for the MyHeritage Family Graph API.
//!
//! Implements the OAuth2 authorization-code flow for web applications and a
//! thin dispatcher for Family Graph REST calls:
//!
//! - [`GraphClient::login_url`] sends the user to the provider with a CSRF
//!   state token
//! - on the callback, the authorization code is exchanged for an access token
//!   and persisted through a [`SessionStore`]
//! - [`GraphClient::api`] calls the API with the resolved bearer token
//! - [`GraphClient::user_id`] identifies the signed-in user
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use familygraph::{ApiParams, CurrentRequest, GraphClient, GraphConfig, InMemorySessionStore};
//!
//! # async fn run() -> familygraph::Result<()> {
//! let config = GraphConfig::new("client-id", "client-secret");
//! let store = InMemorySessionStore::new(&config.client_id);
//! let mut client = GraphClient::builder(config)
//!     .store(Arc::new(store))
//!     .request(CurrentRequest::new(true, "app.example.com", "/family?code=abc&state=xyz"))
//!     .build()
//!     .await?;
//!
//! if client.is_logged_in().await? {
//!     let me = client.api("me", ApiParams::new()).await?;
//!     println!("hello {}", me["name"]);
//! } else {
//!     println!("sign in at {}", client.login_url(ApiParams::new()).await?);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod store;
pub mod transport;
pub mod urls;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::Resolution;
pub use client::{GraphClient, GraphClientBuilder};
pub use config::{DomainMap, GraphConfig, HttpConfig};
pub use error::{ErrorKind, GraphError, Result};
pub use params::{ApiParams, ApiPath};
pub use store::{InMemorySessionStore, SessionKey, SessionStore};
pub use transport::{Transport, TransportBuilder};
pub use urls::{build_url, CurrentRequest, DomainAlias};
