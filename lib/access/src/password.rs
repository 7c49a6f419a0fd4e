//! Static admin password login.

use async_trait::async_trait;
use garage_console_core::SessionStore;
use std::fmt;
use tracing::{error, info, instrument, warn};

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::provider::{AuthProvider, CredentialProvider};
use crate::session::mark_authenticated;

/// The configured admin username and bcrypt hash.
#[derive(Clone)]
struct AdminCredential {
    username: String,
    password_hash: String,
}

/// Validates a single admin `user:bcrypt-hash` pair.
///
/// The provider exists whenever a pair was configured at all. A pair that
/// cannot be split into a username and a hash still yields a provider so
/// that password login is reported as enabled, but every attempt against it
/// fails with a configuration error.
#[derive(Clone)]
pub struct PasswordProvider {
    credential: Option<AdminCredential>,
}

impl PasswordProvider {
    /// Builds the provider from the raw `user:hash` setting.
    ///
    /// Returns `None` when the setting is empty, meaning password login is
    /// not configured.
    #[must_use]
    pub fn from_pair(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let credential = match raw.split_once(':') {
            Some((username, hash)) if !username.is_empty() && !hash.is_empty() => {
                Some(AdminCredential {
                    username: username.to_string(),
                    password_hash: hash.to_string(),
                })
            }
            _ => {
                warn!("admin credential pair is not in user:hash form");
                None
            }
        };

        Some(Self { credential })
    }

    /// Returns true if the configured pair is well formed.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.credential.is_some()
    }

    /// Checks `credentials` against the configured pair.
    ///
    /// The bcrypt comparison always runs, even when the username does not
    /// match, so the response time does not reveal which half was wrong.
    async fn verify(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let admin = self
            .credential
            .clone()
            .ok_or_else(|| AuthError::config("password authentication not configured"))?;

        let username_matches = credentials.username().trim() == admin.username;
        let password = credentials.password().to_string();
        let hash = admin.password_hash;

        let password_matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| {
                error!(error = %e, "password verification task failed");
                AuthError::upstream("password verification failed")
            })?
            .unwrap_or_else(|e| {
                error!(error = %e, "configured admin password hash is not a valid bcrypt hash");
                false
            });

        if username_matches && password_matches {
            Ok(())
        } else {
            Err(AuthError::invalid_credentials())
        }
    }
}

impl fmt::Debug for PasswordProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordProvider")
            .field("usable", &self.is_usable())
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for PasswordProvider {
    fn kind(&self) -> AuthProvider {
        AuthProvider::Password
    }

    #[instrument(skip_all, fields(provider = "password", username = %credentials.username()))]
    async fn attempt_login(
        &self,
        credentials: &Credentials,
        session: &dyn SessionStore,
    ) -> Result<(), AuthError> {
        if let Err(err) = self.verify(credentials).await {
            warn!(error = %err, "password login rejected");
            return Err(err);
        }

        mark_authenticated(session, self.kind()).await?;
        info!("password login succeeded");
        Ok(())
    }
}
