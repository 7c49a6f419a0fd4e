//! Reading and writing the authentication flag in a client session.

use garage_console_core::{SessionError, SessionKey, SessionStore};
use rootcause::Report;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::AuthError;
use crate::provider::AuthProvider;

/// Returns true only when the session holds exactly `authenticated = true`.
///
/// A missing key, a value of any other type, or a store failure all read
/// as not authenticated.
pub async fn is_authenticated(session: &dyn SessionStore) -> bool {
    match session.get_value(SessionKey::Authenticated).await {
        Ok(Some(Value::Bool(true))) => true,
        Ok(Some(other)) if !other.is_boolean() => {
            warn!(value_type = json_type(&other), "non-boolean authenticated flag in session");
            false
        }
        Ok(_) => false,
        Err(report) => {
            warn!(error = %report, "cannot read session; treating as unauthenticated");
            false
        }
    }
}

/// Promotes `session` after a provider accepted the caller.
///
/// The session identifier is regenerated first so that an identifier issued
/// before login is never the one that ends up authenticated. The provider tag
/// is written before the flag.
///
/// # Errors
///
/// Returns an upstream error if the session store rejects any write.
pub async fn mark_authenticated(
    session: &dyn SessionStore,
    provider: AuthProvider,
) -> Result<(), AuthError> {
    let store_failed = |report: Report<SessionError>| {
        error!(error = %report, %provider, "cannot persist login in session");
        AuthError::upstream("session store unavailable")
    };

    session.regenerate().await.map_err(&store_failed)?;
    session
        .set_value(SessionKey::AuthProvider, Value::from(provider.as_str()))
        .await
        .map_err(&store_failed)?;
    session
        .set_value(SessionKey::Authenticated, Value::Bool(true))
        .await
        .map_err(&store_failed)?;

    debug!(%provider, "session authenticated");
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
