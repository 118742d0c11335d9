//! Identity of the signed-in user

use serde_json::Value;
use tracing::{debug, info, warn};

use super::Resolution;
use crate::client::GraphClient;
use crate::error::Result;
use crate::params::ApiParams;
use crate::store::SessionKey;

/// Object path describing the token's owner.
pub const ME_PATH: &str = "me";

impl GraphClient {
    /// Id of the user the access token belongs to
    ///
    /// With no access token the user is anonymous (`None`). The persisted id
    /// is reused only when it was recorded for the very token in use;
    /// otherwise the id is fetched from `me` and persisted. A failed lookup,
    /// whatever its cause, resets the whole session (memory and store) and
    /// yields `None`.
    /// The outcome is memoized.
    ///
    /// # Errors
    /// Returns `GraphError::Store` if the session store fails
    pub async fn user_id(&mut self) -> Result<Option<String>> {
        if let Some(cached) = self.user_id.cached() {
            return Ok(cached);
        }

        let user_id = self.user_from_available_data().await?;
        self.user_id = Resolution::Resolved(user_id.clone());
        Ok(user_id)
    }

    /// Whether a user is signed in.
    ///
    /// # Errors
    /// Returns `GraphError::Store` if the session store fails
    pub async fn is_logged_in(&mut self) -> Result<bool> {
        Ok(self.user_id().await?.is_some())
    }

    async fn user_from_available_data(&mut self) -> Result<Option<String>> {
        // read before resolving the token, which may persist a fresh one
        let persisted_id = self.store.get(SessionKey::UserId).await?.filter(|id| !id.is_empty());
        let persisted_token = self.store.get(SessionKey::AccessToken).await?;

        let Some(token) = self.access_token().await? else {
            return Ok(None);
        };

        if let Some(id) = persisted_id {
            if persisted_token.as_deref() == Some(token.as_str()) {
                debug!("Reusing persisted user id");
                return Ok(Some(id));
            }
        }

        match self.user_from_access_token().await {
            Some(id) => {
                self.store.set(SessionKey::UserId, &id).await?;
                info!(user_id = %id, "Resolved signed-in user");
                Ok(Some(id))
            }
            None => {
                self.invalidate_session().await?;
                Ok(None)
            }
        }
    }

    async fn user_from_access_token(&mut self) -> Option<String> {
        match self.api(ME_PATH, ApiParams::new()).await {
            Ok(me) => match me.get("id") {
                Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => {
                    warn!("User lookup response carried no id");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "Failed to resolve user from access token");
                None
            }
        }
    }
}
