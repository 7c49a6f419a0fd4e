//! OIDC identity provider configuration.

use std::fmt;

use super::claims::RequiredClaim;

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPES: &str = "openid,profile,email";

/// Name shown on the login button when none is configured.
pub const DEFAULT_PROVIDER_NAME: &str = "SSO";

/// Configuration for the OIDC identity provider.
///
/// Connects to any provider that publishes discovery metadata (Keycloak,
/// Authentik, Dex, ...). Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct OidcConfig {
    /// Issuer URL used for discovery (e.g., "https://auth.example.com/realms/main").
    issuer_url: String,
    client_id: String,
    client_secret: String,
    /// Callback URL registered with the provider.
    redirect_url: String,
    /// Comma-separated scopes.
    scopes: String,
    provider_name: String,
    required_claim: Option<RequiredClaim>,
}

impl OidcConfig {
    /// Creates a new OIDC configuration with defaults for optional fields.
    #[must_use]
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        OidcConfigBuilder::new(issuer_url, client_id, client_secret, redirect_url).build()
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> OidcConfigBuilder {
        OidcConfigBuilder::new(issuer_url, client_id, client_secret, redirect_url)
    }

    /// Returns the OIDC issuer URL.
    #[must_use]
    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the OAuth2 redirect URL.
    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Returns the scopes to request, parsed from the comma-separated string.
    /// Blank entries are skipped.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Returns the display name of the provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Returns the claim an ID token must carry, if one is configured.
    #[must_use]
    pub fn required_claim(&self) -> Option<&RequiredClaim> {
        self.required_claim.as_ref()
    }
}

impl fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcConfig")
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .field("provider_name", &self.provider_name)
            .field("required_claim", &self.required_claim)
            .finish()
    }
}

/// Builder for `OidcConfig`.
pub struct OidcConfigBuilder {
    issuer_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    provider_name: Option<String>,
    required_claim: Option<RequiredClaim>,
}

impl OidcConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        Self {
            issuer_url,
            client_id,
            client_secret,
            redirect_url,
            scopes: DEFAULT_SCOPES.split(',').map(str::to_string).collect(),
            provider_name: None,
            required_claim: None,
        }
    }

    /// Replaces the scopes with a comma-separated list. An empty list keeps
    /// the defaults.
    #[must_use]
    pub fn scopes(mut self, scopes: &str) -> Self {
        let parsed: Vec<String> = scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !parsed.is_empty() {
            self.scopes = parsed;
        }
        self
    }

    /// Sets the display name. An empty name keeps the default.
    #[must_use]
    pub fn provider_name(mut self, name: String) -> Self {
        self.provider_name = Some(name).filter(|n| !n.trim().is_empty());
        self
    }

    /// Requires `name` to match `value` in every ID token. Ignored unless
    /// both are non-empty.
    #[must_use]
    pub fn required_claim(mut self, name: String, value: String) -> Self {
        self.required_claim = RequiredClaim::new(name, value);
        self
    }

    /// Builds the `OidcConfig`.
    #[must_use]
    pub fn build(self) -> OidcConfig {
        OidcConfig {
            issuer_url: self.issuer_url,
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_url: self.redirect_url,
            scopes: self.scopes.join(","),
            provider_name: self
                .provider_name
                .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
            required_claim: self.required_claim,
        }
    }
}
