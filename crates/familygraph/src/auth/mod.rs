//! OAuth2 authorization-code flow
//!
//! This module provides the session half of [`GraphClient`](crate::GraphClient):
//! - **CSRF state**: a random token minted for each login URL and checked,
//!   once, on the callback
//! - **Access token**: resolved lazily from an explicit override, a fresh
//!   authorization code, or the persisted session, then memoized
//! - **Identity**: the id of the signed-in user, looked up via `me` only when
//!   the persisted id cannot be trusted for the current token
//!
//! ## Resolution flow
//!
//! ```text
//! access_token()
//!   ├─ memoized?                      → return it
//!   ├─ callback code + matching state → exchange at oauth2/token, persist
//!   ├─ persisted access_token         → use it
//!   └─ otherwise                      → none
//! ```
//!
//! Both caches are [`Resolution`] values: `Unresolved` until first asked,
//! then `Resolved` (possibly to "none") until the session is invalidated.

pub mod identity;
pub mod state;
pub mod token;

pub use state::{generate_state, validate_state};

/// Memoized outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Resolution<T> {
    /// Not looked up yet.
    #[default]
    Unresolved,
    /// Looked up; `None` means "known to be absent".
    Resolved(Option<T>),
}

impl<T: Clone> Resolution<T> {
    /// The memoized value, or `None` when a lookup is still required.
    pub(crate) fn cached(&self) -> Option<Option<T>> {
        match self {
            Self::Unresolved => None,
            Self::Resolved(value) => Some(value.clone()),
        }
    }
}
