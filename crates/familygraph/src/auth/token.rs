//! Access token resolution and the code-for-token exchange

use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::{info, instrument, warn};

use super::Resolution;
use crate::client::GraphClient;
use crate::error::Result;
use crate::store::SessionKey;
use crate::urls::{build_url, DomainAlias};

/// Path of the token endpoint on the accounts host.
pub const TOKEN_PATH: &str = "oauth2/token";

impl GraphClient {
    /// Use `token` for every subsequent call, bypassing resolution.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Resolution::Resolved(Some(token.into()));
    }

    /// Access token for API calls
    ///
    /// Resolved once per instance, in order: an authorization code on the
    /// current request whose CSRF state checks out (exchanged and persisted
    /// unless it is the code already exchanged), then the persisted token.
    /// The outcome is memoized, including "no token".
    ///
    /// A code the provider refuses to exchange invalidates the persisted
    /// session and resolves to `None`.
    ///
    /// # Errors
    /// Returns `GraphError::Store` if the session store fails
    pub async fn access_token(&mut self) -> Result<Option<String>> {
        if let Some(cached) = self.access_token.cached() {
            return Ok(cached);
        }

        let token = self.user_access_token().await?;
        self.access_token = Resolution::Resolved(token.clone());
        Ok(token)
    }

    async fn user_access_token(&mut self) -> Result<Option<String>> {
        if let Some(code) = self.authorization_code().await? {
            let persisted_code = self.store.get(SessionKey::Code).await?;
            if persisted_code.as_deref() != Some(code.as_str()) {
                if let Some(token) = self.exchange_code(&code).await {
                    self.store.set(SessionKey::Code, &code).await?;
                    self.store.set(SessionKey::AccessToken, &token).await?;
                    info!("Access token obtained from authorization code");
                    return Ok(Some(token));
                }

                // everything derived from a bogus code is stale
                self.store.clear_all().await?;
                return Ok(None);
            }
        }

        Ok(self.store.get(SessionKey::AccessToken).await?.filter(|t| !t.is_empty()))
    }

    /// Trade an authorization code for an access token.
    ///
    /// Failures are logged and reported as `None`.
    #[instrument(skip_all)]
    async fn exchange_code(&mut self, code: &str) -> Option<String> {
        let url = build_url(&self.config.domains, DomainAlias::Accounts, TOKEN_PATH, &[]);
        let params = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("client_secret".to_string(), self.config.client_secret.clone()),
            ("redirect_uri".to_string(), self.current_url()),
            ("code".to_string(), code.to_string()),
        ];

        let result = match self.send_request(Method::POST, &url, &params, HeaderMap::new()).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Failed to convert code to token");
                return None;
            }
        };

        match result.get("access_token").and_then(|t| t.as_str()).filter(|t| !t.is_empty()) {
            Some(token) => Some(token.to_string()),
            None => {
                warn!("Token endpoint response carried no access_token");
                None
            }
        }
    }
}
