//! CSRF protection for the authorization-code callback
//!
//! A state token is minted the first time a login URL is built and persisted
//! so that it survives the round trip to the provider. The callback's `code`
//! is only honoured when the request carries the same `state`; the token is
//! then discarded so a replayed callback is rejected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use tracing::debug;

use crate::client::GraphClient;
use crate::error::Result;
use crate::store::SessionKey;

/// Random bytes behind one callback state.
const STATE_BYTES: usize = 32;

/// Mint a callback state for one login round trip.
///
/// The value travels in the authorize URL and back on the callback query, so
/// it is base64url without padding.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether the `state` echoed on a callback is the one still pending.
///
/// An empty pending state never matches.
#[must_use]
pub fn validate_state(pending: &str, echoed: &str) -> bool {
    !pending.is_empty() && pending == echoed
}

impl GraphClient {
    /// Mint and persist a CSRF state unless one is already pending.
    ///
    /// # Errors
    /// Returns error if the state cannot be persisted
    pub(crate) async fn establish_csrf_state(&mut self) -> Result<String> {
        if let Some(state) = &self.csrf_state {
            return Ok(state.clone());
        }

        let state = generate_state();
        self.store.set(SessionKey::State, &state).await?;
        self.csrf_state = Some(state.clone());
        Ok(state)
    }

    /// Authorization code from the current request, if its CSRF state checks out.
    ///
    /// A successful check consumes the state, in memory and in the store.
    ///
    /// # Errors
    /// Returns error if the consumed state cannot be cleared from the store
    pub(crate) async fn authorization_code(&mut self) -> Result<Option<String>> {
        let Some(code) = self.request.non_empty_param("code").map(str::to_string) else {
            return Ok(None);
        };

        let matches = match (&self.csrf_state, self.request.param("state")) {
            (Some(expected), Some(received)) => validate_state(expected, received),
            _ => false,
        };

        if !matches {
            debug!("CSRF state token does not match one provided");
            return Ok(None);
        }

        self.csrf_state = None;
        self.store.clear(SessionKey::State).await?;
        Ok(Some(code))
    }
}
