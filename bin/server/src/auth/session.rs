//! Cookie-backed sessions.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use garage_console_core::{Result, SessionError, SessionKey, SessionStore};
use serde_json::Value;
use tower_sessions::Session;

/// The `tower-sessions` session of the current request, exposed to the
/// access layer as a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct CookieSession(pub Session);

impl<S> FromRequestParts<S> for CookieSession
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self)
    }
}

fn unavailable(err: tower_sessions::session::Error) -> SessionError {
    SessionError::Unavailable {
        details: err.to_string(),
    }
}

#[async_trait]
impl SessionStore for CookieSession {
    async fn get_value(&self, key: SessionKey) -> Result<Option<Value>, SessionError> {
        Ok(self.0.get_value(key.as_str()).await.map_err(unavailable)?)
    }

    async fn set_value(&self, key: SessionKey, value: Value) -> Result<(), SessionError> {
        self.0
            .insert_value(key.as_str(), value)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn remove_value(&self, key: SessionKey) -> Result<Option<Value>, SessionError> {
        Ok(self
            .0
            .remove_value(key.as_str())
            .await
            .map_err(unavailable)?)
    }

    async fn clear(&self) -> Result<(), SessionError> {
        self.0.flush().await.map_err(unavailable)?;
        Ok(())
    }

    async fn regenerate(&self) -> Result<(), SessionError> {
        self.0.cycle_id().await.map_err(unavailable)?;
        Ok(())
    }
}
