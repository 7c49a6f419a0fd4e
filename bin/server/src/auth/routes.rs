//! Authentication routes for login, status, logout and the OIDC flow.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Redirect;
use garage_console_access::{AuthStatus, CallbackParams, LoginSelection};
use serde::Deserialize;
use serde_json::{Value, json};

use super::CookieSession;
use crate::app::AppState;
use crate::error::ApiError;

/// Query parameters for the login route.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    provider: Option<String>,
}

/// Logs in with a username and password, against LDAP when
/// `?provider=ldap` is given.
pub async fn login(
    State(state): State<AppState>,
    query: Result<Query<LoginQuery>, QueryRejection>,
    session: CookieSession,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let selection = LoginSelection::from_query(query.provider.as_deref());
    state.gateway.login(selection, &body, &session).await?;
    Ok(Json(json!({ "authenticated": true })))
}

/// Reports whether authentication is enabled and this session passed it.
pub async fn status(State(state): State<AppState>, session: CookieSession) -> Json<AuthStatus> {
    Json(state.gateway.status(&session).await)
}

/// Drops the session.
pub async fn logout(State(state): State<AppState>, session: CookieSession) -> Json<bool> {
    state.gateway.logout(&session).await;
    Json(true)
}

/// Redirects the browser to the identity provider.
pub async fn oidc_login(
    State(state): State<AppState>,
    session: CookieSession,
) -> Result<Redirect, ApiError> {
    let oidc = state
        .gateway
        .oidc()
        .ok_or_else(|| ApiError::not_found("OIDC is not configured"))?;

    let url = oidc.begin_handshake(&session).await?;
    Ok(Redirect::temporary(url.as_str()))
}

/// Completes the OIDC flow and sends the browser back to the console.
pub async fn oidc_callback(
    State(state): State<AppState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
    session: CookieSession,
) -> Result<Redirect, ApiError> {
    let oidc = state
        .gateway
        .oidc()
        .ok_or_else(|| ApiError::not_found("OIDC is not configured"))?;
    let Query(params) = params?;

    oidc.complete_handshake(&session, &params).await?;
    Ok(Redirect::temporary(&format!("{}/", state.base_path)))
}

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
