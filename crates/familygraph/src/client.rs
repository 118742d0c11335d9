//! Family Graph API client
//!
//! [`GraphClient`] is created per inbound request. It owns the session caches
//! (CSRF state, access token, user id), reads and writes the persisted session
//! through a [`SessionStore`], and dispatches API calls through the
//! [`Transport`].
//!
//! Calls run one at a time: every method that may touch the network takes
//! `&mut self` and completes its request before returning.
//!
//! ## Session invalidation
//!
//! Whenever the provider answers any request with `invalid_token`, the client
//! forgets its access token and user id, drops the pending CSRF state and
//! clears the persisted session before the error reaches the caller.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::auth::Resolution;
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::params::{self, ApiParams, ApiPath};
use crate::store::{SessionKey, SessionStore};
use crate::transport::{bearer_headers, Transport};
use crate::urls::{build_url, CurrentRequest, DomainAlias};

/// Path of the authorization endpoint on the accounts host.
pub const AUTHORIZE_PATH: &str = "oauth2/authorize";

/// Family Graph client bound to one inbound request
pub struct GraphClient {
    pub(crate) config: GraphConfig,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) transport: Transport,
    pub(crate) request: CurrentRequest,
    pub(crate) csrf_state: Option<String>,
    pub(crate) access_token: Resolution<String>,
    pub(crate) user_id: Resolution<String>,
}

impl GraphClient {
    /// Crate version, also used in the default user agent.
    pub const VERSION: &'static str = crate::VERSION;

    /// Create a builder for fluent configuration
    pub fn builder(config: GraphConfig) -> GraphClientBuilder {
        GraphClientBuilder::new(config)
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.config.client_secret
    }

    #[must_use]
    pub const fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// The inbound request this client serves.
    #[must_use]
    pub const fn current_request(&self) -> &CurrentRequest {
        &self.request
    }

    /// URL of the current page without OAuth2 callback parameters.
    #[must_use]
    pub fn current_url(&self) -> String {
        self.request.current_url()
    }

    /// Call the Family Graph API
    ///
    /// `path` is either one object path, optionally with its own query string
    /// (merged into `params`, explicit keys winning), or a batch of object ids
    /// sent as `ids=a,b,c` against the API root. Non-string parameter values
    /// are sent as JSON text. The access token, when one resolves, is sent as
    /// a bearer token.
    ///
    /// # Arguments
    /// * `path` - Object path or batch of ids
    /// * `params` - Query parameters
    ///
    /// # Returns
    /// The decoded JSON response
    ///
    /// # Errors
    /// Returns `Transport`, `Parse` or `Protocol` errors from the request, or
    /// `Store` if resolving the access token fails. An `invalid_token`
    /// protocol error resets the session first.
    #[instrument(skip_all, fields(path = tracing::field::Empty))]
    pub async fn api(&mut self, path: impl Into<ApiPath>, params: ApiParams) -> Result<Value> {
        let (path, params) = params::resolve(path.into(), params);
        tracing::Span::current().record("path", path.as_str());

        let url = build_url(&self.config.domains, DomainAlias::Graph, &path, &[]);
        let token = self.access_token().await?;

        let headers = bearer_headers(token.as_deref())?;

        self.send_request(Method::GET, &url, &params.to_pairs(), headers).await
    }

    /// URL that starts the provider's login flow
    ///
    /// Carries `response_type=code`, the client id, the current URL as
    /// `redirect_uri` and a CSRF `state` that is minted and persisted on first
    /// use. Entries in `overrides` (`redirect_uri`, `scope`, `display=popup`,
    /// ...) replace or extend the defaults.
    ///
    /// # Errors
    /// Returns `GraphError::Store` if the CSRF state cannot be persisted
    pub async fn login_url(&mut self, overrides: ApiParams) -> Result<String> {
        let state = self.establish_csrf_state().await?;

        let mut params = ApiParams::new()
            .with("response_type", "code")
            .with("client_id", self.config.client_id.clone())
            .with("redirect_uri", self.current_url())
            .with("state", state);
        for (key, value) in overrides.to_pairs() {
            params.insert(key, value);
        }

        Ok(build_url(&self.config.domains, DomainAlias::Accounts, AUTHORIZE_PATH, &params.to_pairs()))
    }

    /// Forget the access token, user id and CSRF state, and clear the
    /// persisted session.
    ///
    /// # Errors
    /// Returns `GraphError::Store` if the persisted session cannot be cleared
    pub async fn invalidate_session(&mut self) -> Result<()> {
        self.access_token = Resolution::Unresolved;
        self.user_id = Resolution::Resolved(None);
        self.csrf_state = None;
        self.store.clear_all().await
    }

    /// Sign the current user out.
    ///
    /// # Errors
    /// Returns `GraphError::Store` if the persisted session cannot be cleared
    pub async fn logout(&mut self) -> Result<()> {
        self.invalidate_session().await?;
        info!("Signed out");
        Ok(())
    }

    /// Send a request, resetting the session on `invalid_token`.
    pub(crate) async fn send_request(
        &mut self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        headers: HeaderMap,
    ) -> Result<Value> {
        let result = self.transport.send(method, url, params, headers).await;
        match result {
            Err(err) if err.is_invalid_token() => {
                warn!("Access token rejected, clearing session");
                if let Err(store_err) = self.invalidate_session().await {
                    warn!(error = %store_err, "Failed to clear persisted session");
                }
                Err(err)
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("client_id", &self.config.client_id)
            .field("request", &self.request)
            .field("has_csrf_state", &self.csrf_state.is_some())
            .field("access_token_resolved", &!matches!(self.access_token, Resolution::Unresolved))
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GraphClient`]
pub struct GraphClientBuilder {
    config: GraphConfig,
    store: Option<Arc<dyn SessionStore>>,
    request: Option<CurrentRequest>,
    transport: Option<Transport>,
}

impl GraphClientBuilder {
    /// Create a builder around `config`.
    pub fn new(config: GraphConfig) -> Self {
        Self { config, store: None, request: None, transport: None }
    }

    /// Set the session store (required)
    #[must_use]
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the inbound request being served (required)
    #[must_use]
    pub fn request(mut self, request: CurrentRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Use a preconfigured transport instead of one built from the config.
    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client, restoring any pending CSRF state from the store.
    ///
    /// # Errors
    /// Returns `GraphError::Config` if the configuration is invalid or the
    /// store or request is missing, and `GraphError::Store` if the pending
    /// state cannot be read.
    pub async fn build(self) -> Result<GraphClient> {
        self.config.validate()?;

        let store =
            self.store.ok_or_else(|| GraphError::Config("session store is required".to_string()))?;
        let request =
            self.request.ok_or_else(|| GraphError::Config("current request is required".to_string()))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Transport::from_config(&self.config.http)?,
        };

        let csrf_state = store.get(SessionKey::State).await?.filter(|s| !s.is_empty());

        Ok(GraphClient {
            config: self.config,
            store,
            transport,
            request,
            csrf_state,
            access_token: Resolution::Unresolved,
            user_id: Resolution::Unresolved,
        })
    }
}
