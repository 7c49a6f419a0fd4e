//! Login credentials submitted by a client.

use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::error::AuthError;

/// A username and password pair taken from a login request body.
///
/// Credentials live only for the duration of one login attempt and are
/// never written to the session.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials from their parts.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parses a `{"username": ..., "password": ...}` JSON body.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the body is not valid JSON or either
    /// field is missing or not a string.
    pub fn from_json(body: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(body).map_err(|e| {
            debug!(error = %e, "rejected login body");
            AuthError::validation("invalid request body")
        })
    }

    /// Returns the username as submitted.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password as submitted.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
