//! Authentication gate for protected routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use garage_console_access::session::is_authenticated;
use tracing::debug;

use super::CookieSession;
use crate::app::AppState;
use crate::error::ApiError;

/// Lets a request through when authentication is disabled or the session is
/// authenticated; answers 401 otherwise.
pub async fn require_auth(
    State(state): State<AppState>,
    session: CookieSession,
    request: Request,
    next: Next,
) -> Response {
    if !state.gateway.is_enabled() || is_authenticated(&session).await {
        return next.run(request).await;
    }

    debug!(path = %request.uri().path(), "rejected unauthenticated request");
    ApiError::unauthorized().into_response()
}
