//! Session persistence
//!
//! The client keeps four pieces of state across page loads: the CSRF `state`
//! sent with the last login URL, the last authorization `code` exchanged, the
//! resulting `access_token` and the resolved `user_id`. Where they live is up
//! to the integrator (a web session, a cookie jar, a database row) and is
//! abstracted behind [`SessionStore`].
//!
//! [`InMemorySessionStore`] is the reference implementation. It namespaces
//! every key with the client id so that two applications sharing one backing
//! map never read each other's tokens.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;

/// Keys the client persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// CSRF token sent with the most recent login URL.
    State,
    /// Last authorization code exchanged for a token.
    Code,
    /// Current OAuth2 access token.
    AccessToken,
    /// Identifier of the user the access token belongs to.
    UserId,
}

impl SessionKey {
    /// Every key managed by the client, in a stable order.
    pub const ALL: [Self; 4] = [Self::State, Self::Code, Self::AccessToken, Self::UserId];

    /// Wire name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Code => "code",
            Self::AccessToken => "access_token",
            Self::UserId => "user_id",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent key/value storage for session state
///
/// Implementations must be safe to share between tasks. Any failure should be
/// reported as [`GraphError::Store`](crate::GraphError::Store).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    async fn set(&self, key: SessionKey, value: &str) -> Result<()>;

    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    async fn get(&self, key: SessionKey) -> Result<Option<String>>;

    /// Read `key`, falling back to `default` when it is absent.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    async fn get_or(&self, key: SessionKey, default: &str) -> Result<String> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    async fn clear(&self, key: SessionKey) -> Result<()>;

    /// Remove every key in [`SessionKey::ALL`].
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    async fn clear_all(&self) -> Result<()>;
}

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory [`SessionStore`]
///
/// Cloning yields another handle to the same storage, which lets a caller keep
/// a handle for inspection after handing one to the client.
#[derive(Clone)]
pub struct InMemorySessionStore {
    storage: StorageData,
    namespace: String,
}

impl InMemorySessionStore {
    /// Create an empty store whose keys are scoped to `client_id`.
    pub fn new(client_id: impl AsRef<str>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            namespace: format!("fg_{}", client_id.as_ref()),
        }
    }

    /// Create a store scoped to `client_id` on top of existing shared storage.
    #[must_use]
    pub fn with_shared(&self, client_id: impl AsRef<str>) -> Self {
        Self { storage: Arc::clone(&self.storage), namespace: format!("fg_{}", client_id.as_ref()) }
    }

    /// Fully qualified key as written to the backing map.
    #[must_use]
    pub fn scoped_key(&self, key: SessionKey) -> String {
        format!("{}_{}", self.namespace, key.as_str())
    }

    /// Synchronous read, mostly useful for assertions.
    #[must_use]
    pub fn peek(&self, key: SessionKey) -> Option<String> {
        self.storage.lock().get(&self.scoped_key(key)).cloned()
    }

    /// Whether none of this namespace's keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        SessionKey::ALL.iter().all(|key| self.peek(*key).is_none())
    }
}

impl fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<&str> = SessionKey::ALL
            .iter()
            .filter(|key| self.peek(**key).is_some())
            .map(|key| key.as_str())
            .collect();
        f.debug_struct("InMemorySessionStore")
            .field("namespace", &self.namespace)
            .field("present", &present)
            .finish()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set(&self, key: SessionKey, value: &str) -> Result<()> {
        self.storage.lock().insert(self.scoped_key(key), value.to_string());
        Ok(())
    }

    async fn get(&self, key: SessionKey) -> Result<Option<String>> {
        Ok(self.peek(key))
    }

    async fn clear(&self, key: SessionKey) -> Result<()> {
        self.storage.lock().remove(&self.scoped_key(key));
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut storage = self.storage.lock();
        for key in SessionKey::ALL {
            storage.remove(&self.scoped_key(key));
        }
        Ok(())
    }
}
