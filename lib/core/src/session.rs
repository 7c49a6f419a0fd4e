//! Per-client session capability.
//!
//! The authentication layer never talks to a concrete session backend.
//! It is handed something implementing [`SessionStore`], scoped to the
//! client making the current request, and reads or writes a small fixed
//! set of keys through it.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Keys written into a client session by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Boolean flag; exactly `true` once a provider accepted the client.
    Authenticated,
    /// Which provider authenticated the session.
    AuthProvider,
    /// Pending OIDC handshake, present between redirect and callback.
    OidcState,
}

impl SessionKey {
    /// Returns the key as stored in the session backend.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::AuthProvider => "auth_provider",
            Self::OidcState => "oidc_state",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a session backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The backend could not be reached or refused the operation.
    Unavailable { details: String },
    /// A stored value could not be decoded into the expected shape.
    Corrupt { key: SessionKey, details: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => {
                write!(f, "session store unavailable: {details}")
            }
            Self::Corrupt { key, details } => {
                write!(f, "session value '{key}' is corrupt: {details}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Keyed mutable state belonging to a single client.
///
/// Implementations must make each operation atomic for that client and keep
/// distinct clients independent. Nothing else is assumed about storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads a value, `None` when the key was never set.
    async fn get_value(&self, key: SessionKey) -> Result<Option<Value>, SessionError>;

    /// Writes a value, replacing any previous one.
    async fn set_value(&self, key: SessionKey, value: Value) -> Result<(), SessionError>;

    /// Removes a value and returns what was stored.
    async fn remove_value(&self, key: SessionKey) -> Result<Option<Value>, SessionError>;

    /// Drops every value for this client.
    async fn clear(&self) -> Result<(), SessionError>;

    /// Issues a new session identifier while keeping the stored values.
    async fn regenerate(&self) -> Result<(), SessionError>;
}

/// Process-local session used by tests and by callers that hold a single
/// client's state directly.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<SessionKey, Value>>,
    generation: AtomicU64,
}

impl MemorySession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times the identifier was regenerated.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns true when no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().map(|v| v.is_empty()).unwrap_or(true)
    }

    fn with_values<T>(
        &self,
        f: impl FnOnce(&mut HashMap<SessionKey, Value>) -> T,
    ) -> Result<T, SessionError> {
        let mut values = self.values.lock().map_err(|e| SessionError::Unavailable {
            details: e.to_string(),
        })?;
        Ok(f(&mut values))
    }
}

#[async_trait]
impl SessionStore for MemorySession {
    async fn get_value(&self, key: SessionKey) -> Result<Option<Value>, SessionError> {
        self.with_values(|values| values.get(&key).cloned())
    }

    async fn set_value(&self, key: SessionKey, value: Value) -> Result<(), SessionError> {
        self.with_values(|values| {
            values.insert(key, value);
        })
    }

    async fn remove_value(&self, key: SessionKey) -> Result<Option<Value>, SessionError> {
        self.with_values(|values| values.remove(&key))
    }

    async fn clear(&self) -> Result<(), SessionError> {
        self.with_values(HashMap::clear)
    }

    async fn regenerate(&self) -> Result<(), SessionError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_keys_match_stored_names() {
        assert_eq!(SessionKey::Authenticated.as_str(), "authenticated");
        assert_eq!(SessionKey::AuthProvider.as_str(), "auth_provider");
        assert_eq!(SessionKey::OidcState.to_string(), "oidc_state");
    }

    #[test]
    fn corrupt_error_names_the_key() {
        let err = SessionError::Corrupt {
            key: SessionKey::OidcState,
            details: "expected object".to_string(),
        };
        assert!(err.to_string().contains("oidc_state"));
        assert!(err.to_string().contains("expected object"));
    }

    #[tokio::test]
    async fn memory_session_set_get_remove() {
        let session = MemorySession::new();
        assert_eq!(
            session
                .get_value(SessionKey::Authenticated)
                .await
                .expect("get"),
            None
        );

        session
            .set_value(SessionKey::Authenticated, json!(true))
            .await
            .expect("set");
        assert_eq!(
            session
                .get_value(SessionKey::Authenticated)
                .await
                .expect("get"),
            Some(json!(true))
        );

        let removed = session
            .remove_value(SessionKey::Authenticated)
            .await
            .expect("remove");
        assert_eq!(removed, Some(json!(true)));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn memory_session_clear_drops_everything() {
        let session = MemorySession::new();
        session
            .set_value(SessionKey::Authenticated, json!(true))
            .await
            .expect("set");
        session
            .set_value(SessionKey::AuthProvider, json!("ldap"))
            .await
            .expect("set");

        session.clear().await.expect("clear");
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn regenerate_keeps_values() {
        let session = MemorySession::new();
        session
            .set_value(SessionKey::AuthProvider, json!("oidc"))
            .await
            .expect("set");

        session.regenerate().await.expect("regenerate");

        assert_eq!(session.generation(), 1);
        assert_eq!(
            session
                .get_value(SessionKey::AuthProvider)
                .await
                .expect("get"),
            Some(json!("oidc"))
        );
    }
}
