//! HTTP surface of authentication.
//!
//! This module provides:
//! - The login, status, logout and OIDC routes
//! - The middleware gating every protected route
//! - The adapter exposing a `tower-sessions` session to the access layer
//!
//! The middleware looks only at the session's `authenticated` flag, so it
//! does not care which provider set it.

pub mod middleware;
pub mod routes;
pub mod session;

pub use middleware::require_auth;
pub use session::CookieSession;
