//! Authenticated pass-through to the cluster admin API.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::app::AppState;
use crate::config::AdminApiSettings;
use crate::error::ApiError;

/// Largest request body forwarded to the admin API.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the cluster admin API.
#[derive(Debug, Clone)]
pub struct AdminApi {
    client: reqwest::Client,
    base_url: String,
    admin_key: String,
}

impl AdminApi {
    /// Creates a client for `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: AdminApiSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url,
            admin_key: settings.admin_key,
        })
    }

    fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

/// Forwards the request, minus the `/api` prefix, to the admin API and
/// relays the answer.
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let Some(api) = state.admin_api.as_deref() else {
        warn!("admin API request without API_BASE_URL configured");
        return ApiError::internal("admin API not configured").into_response();
    };

    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "cannot read request body");
            return ApiError::new(axum::http::StatusCode::BAD_REQUEST, "invalid request body")
                .into_response();
        }
    };

    let mut upstream = api
        .client
        .request(parts.method.clone(), api.url_for(&path_and_query))
        .bearer_auth(&api.admin_key)
        .body(body);
    if let Some(content_type) = parts.headers.get(CONTENT_TYPE) {
        upstream = upstream.header(CONTENT_TYPE, content_type.clone());
    }

    let reply = match upstream.send().await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, method = %parts.method, path = %parts.uri.path(), "admin API request failed");
            return ApiError::bad_gateway("admin API unreachable").into_response();
        }
    };

    let status = reply.status();
    let content_type = reply.headers().get(CONTENT_TYPE).cloned();
    let bytes = match reply.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "cannot read admin API response");
            return ApiError::bad_gateway("admin API unreachable").into_response();
        }
    };

    debug!(method = %parts.method, path = %parts.uri.path(), %status, "admin API request relayed");
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}
