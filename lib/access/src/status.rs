//! The authentication status reported to the browser.

use serde::Serialize;

/// Which login options the UI should offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub password_enabled: bool,
    pub oidc_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_provider_name: Option<String>,
    pub ldap_enabled: bool,
}

/// Whether authentication is enforced and whether this session passed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub enabled: bool,
    pub authenticated: bool,
    pub providers: ProviderSummary,
}
