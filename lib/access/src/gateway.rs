//! The entry point the HTTP layer talks to.

use garage_console_core::SessionStore;
use tracing::{debug, instrument, warn};

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::ldap::LdapProvider;
use crate::oidc::OidcProvider;
use crate::password::PasswordProvider;
use crate::provider::CredentialProvider;
use crate::session::is_authenticated;
use crate::status::{AuthStatus, ProviderSummary};

/// Which credential provider a login request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginSelection {
    /// No explicit choice; the password provider.
    #[default]
    Default,
    /// `?provider=password`: the bcrypt user pair.
    Password,
    /// `?provider=ldap`: the directory, falling back to the password
    /// provider when LDAP is not configured.
    Ldap,
}

impl LoginSelection {
    /// Parses the `provider` query parameter. Unknown values select the
    /// default.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("ldap") => Self::Ldap,
            Some(v) if v.eq_ignore_ascii_case("password") => Self::Password,
            _ => Self::Default,
        }
    }
}

/// Owns the configured providers.
///
/// A provider that is not configured is simply absent. With no provider at
/// all, authentication is disabled and every session counts as
/// authenticated.
#[derive(Default)]
pub struct AuthGateway {
    password: Option<PasswordProvider>,
    ldap: Option<LdapProvider>,
    oidc: Option<OidcProvider>,
}

impl AuthGateway {
    /// Creates a gateway with no providers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_password(mut self, provider: PasswordProvider) -> Self {
        self.password = Some(provider);
        self
    }

    #[must_use]
    pub fn with_ldap(mut self, provider: LdapProvider) -> Self {
        self.ldap = Some(provider);
        self
    }

    #[must_use]
    pub fn with_oidc(mut self, provider: OidcProvider) -> Self {
        self.oidc = Some(provider);
        self
    }

    /// Returns true if at least one provider is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.password.is_some() || self.ldap.is_some() || self.oidc.is_some()
    }

    /// Returns the OIDC provider, if configured.
    #[must_use]
    pub fn oidc(&self) -> Option<&OidcProvider> {
        self.oidc.as_ref()
    }

    /// Authenticates `session` with the credentials in `body`.
    ///
    /// LDAP handles the request only when it was asked for and is
    /// configured; everything else goes to the password provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection, a `Validation` error for a
    /// malformed body, or a `Config` error when password login is not
    /// configured.
    #[instrument(skip_all, fields(selection = ?selection))]
    pub async fn login(
        &self,
        selection: LoginSelection,
        body: &[u8],
        session: &dyn SessionStore,
    ) -> Result<(), AuthError> {
        let credentials = Credentials::from_json(body)?;

        if let (LoginSelection::Ldap, Some(ldap)) = (selection, &self.ldap) {
            return ldap.attempt_login(&credentials, session).await;
        }

        let Some(password) = &self.password else {
            debug!("password login requested but not configured");
            return Err(AuthError::config("password authentication not configured"));
        };
        password.attempt_login(&credentials, session).await
    }

    /// Reports whether authentication is enforced and whether `session`
    /// passed it.
    pub async fn status(&self, session: &dyn SessionStore) -> AuthStatus {
        let enabled = self.is_enabled();
        let authenticated = !enabled || is_authenticated(session).await;

        AuthStatus {
            enabled,
            authenticated,
            providers: ProviderSummary {
                password_enabled: self.password.is_some(),
                oidc_enabled: self.oidc.is_some(),
                oidc_provider_name: self.oidc.as_ref().map(|p| p.provider_name().to_string()),
                ldap_enabled: self.ldap.is_some(),
            },
        }
    }

    /// Drops all state held for `session`. Store failures are logged only.
    pub async fn logout(&self, session: &dyn SessionStore) {
        match session.clear().await {
            Ok(()) => debug!("session cleared"),
            Err(report) => warn!(error = %report, "cannot clear session on logout"),
        }
    }
}
