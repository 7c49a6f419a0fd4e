//! The capability shared by credential-based login providers.

use async_trait::async_trait;
use garage_console_core::SessionStore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::credentials::Credentials;
use crate::error::AuthError;

/// Which provider authenticated a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// The static admin username and password.
    Password,
    /// An LDAP directory bind.
    Ldap,
    /// An OIDC authorization-code flow.
    Oidc,
}

impl AuthProvider {
    /// Returns the tag stored in the session.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Ldap => "ldap",
            Self::Oidc => "oidc",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider that accepts a username and password in one request.
///
/// On success the implementation marks `session` authenticated; on failure
/// it leaves the session untouched.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the tag written to the session on success.
    fn kind(&self) -> AuthProvider;

    /// Verifies `credentials` and promotes `session` when they are accepted.
    async fn attempt_login(
        &self,
        credentials: &Credentials,
        session: &dyn SessionStore,
    ) -> Result<(), AuthError>;
}
