//! Router assembly and shared application state.

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use garage_console_access::{AuthGateway, LdapProvider, OidcProvider, PasswordProvider};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::{info, warn};

use crate::auth::{self, require_auth};
use crate::config::{ServerConfig, SessionSettings};
use crate::proxy::{self, AdminApi};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AuthGateway>,
    /// Base path without a trailing slash.
    pub base_path: Arc<str>,
    pub admin_api: Option<Arc<AdminApi>>,
}

impl AppState {
    /// Creates the state for `gateway` served under `base_path`.
    pub fn new(gateway: AuthGateway, base_path: &str) -> Self {
        Self {
            gateway: Arc::new(gateway),
            base_path: Arc::from(base_path.trim_end_matches('/')),
            admin_api: None,
        }
    }

    #[must_use]
    pub fn with_admin_api(mut self, api: AdminApi) -> Self {
        self.admin_api = Some(Arc::new(api));
        self
    }
}

/// Builds the gateway from configuration.
///
/// An OIDC issuer that cannot be discovered is logged and left out; the
/// other providers stay available.
pub async fn build_gateway(config: &ServerConfig) -> AuthGateway {
    let mut gateway = AuthGateway::new();

    if let Some(password) = config.password_pair().and_then(PasswordProvider::from_pair) {
        info!(usable = password.is_usable(), "password authentication enabled");
        gateway = gateway.with_password(password);
    }

    if let Some(ldap) = config.ldap_config() {
        info!(
            url = %ldap.url(),
            required_groups = ldap.required_groups().len(),
            "LDAP authentication enabled"
        );
        gateway = gateway.with_ldap(LdapProvider::new(ldap));
    }

    if let Some(oidc) = config.oidc_config() {
        match OidcProvider::discover(oidc).await {
            Ok(provider) => {
                info!(provider = provider.provider_name(), "OIDC authentication enabled");
                gateway = gateway.with_oidc(provider);
            }
            Err(report) => {
                warn!(error = %report, "OIDC discovery failed; continuing without OIDC");
            }
        }
    }

    if !gateway.is_enabled() {
        warn!("no authentication provider configured; the console is open access");
    }
    gateway
}

/// Builds the application router.
pub fn router(state: AppState, session: SessionSettings) -> Router {
    let public = Router::new()
        .route("/auth/login", post(auth::routes::login))
        .route("/auth/status", get(auth::routes::status))
        .route("/auth/logout", post(auth::routes::logout))
        .route("/auth/oidc/login", get(auth::routes::oidc_login))
        .route("/auth/oidc/callback", get(auth::routes::oidc_callback))
        .route("/health", get(auth::routes::health));

    let protected = Router::new()
        .fallback(proxy::forward)
        .layer(from_fn_with_state(state.clone(), require_auth));

    let api = public.merge(protected).with_state(state.clone());

    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(session.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session.idle_minutes,
        )));

    Router::new()
        .nest(&format!("{}/api", state.base_path), api)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}
