//! Centralized server configuration.
//!
//! Every setting is a flat environment variable (`AUTH_USER_PASS`,
//! `LDAP_URL`, `OIDC_ISSUER_URL`, ...) loaded through the `config` crate.
//! Values are kept as strings so that client IDs and DNs are never
//! reinterpreted as numbers; the accessors below turn them into provider
//! configurations.

use garage_console_access::{LdapConfig, OidcConfig};
use serde::Deserialize;

/// Server configuration read from the environment.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// URL prefix the console is served under, e.g. `/console`.
    pub base_path: String,

    /// Admin credential as `user:bcrypt-hash`.
    pub auth_user_pass: String,

    pub ldap_url: String,
    pub ldap_base_dn: String,
    pub ldap_bind_dn: String,
    pub ldap_bind_password: String,
    pub ldap_user_filter: String,
    pub ldap_group_base_dn: String,
    pub ldap_group_filter: String,
    /// Comma-separated group names.
    pub ldap_required_groups: String,
    pub ldap_start_tls: bool,

    pub oidc_issuer_url: String,
    pub oidc_client_id: String,
    pub oidc_client_secret: String,
    pub oidc_redirect_url: String,
    pub oidc_scopes: String,
    pub oidc_provider_name: String,
    pub oidc_required_claim: String,
    pub oidc_required_claim_value: String,

    /// Set the Secure flag on the session cookie (requires HTTPS).
    pub session_secure_cookies: bool,
    /// Minutes of inactivity after which a session expires.
    pub session_idle_minutes: i64,

    /// Base URL of the cluster admin API.
    pub api_base_url: String,
    /// Bearer token for the cluster admin API.
    pub api_admin_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3909,
            base_path: String::new(),
            auth_user_pass: String::new(),
            ldap_url: String::new(),
            ldap_base_dn: String::new(),
            ldap_bind_dn: String::new(),
            ldap_bind_password: String::new(),
            ldap_user_filter: String::new(),
            ldap_group_base_dn: String::new(),
            ldap_group_filter: String::new(),
            ldap_required_groups: String::new(),
            ldap_start_tls: false,
            oidc_issuer_url: String::new(),
            oidc_client_id: String::new(),
            oidc_client_secret: String::new(),
            oidc_redirect_url: String::new(),
            oidc_scopes: String::new(),
            oidc_provider_name: String::new(),
            oidc_required_claim: String::new(),
            oidc_required_claim_value: String::new(),
            session_secure_cookies: false,
            session_idle_minutes: 480,
            api_base_url: String::new(),
            api_admin_key: String::new(),
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub secure_cookies: bool,
    pub idle_minutes: i64,
}

/// Connection details for the cluster admin API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminApiSettings {
    pub base_url: String,
    pub admin_key: String,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be converted to its field type.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default())
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be converted to its field type.
    pub fn from_source(vars: config::Map<String, String>) -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default().source(Some(vars)))
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Returns the address to listen on.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the base path without a trailing slash (empty for the root).
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.base_path.trim().trim_end_matches('/')
    }

    /// Returns the admin `user:hash` pair, if one is set.
    #[must_use]
    pub fn password_pair(&self) -> Option<&str> {
        Some(self.auth_user_pass.trim()).filter(|pair| !pair.is_empty())
    }

    /// Returns the LDAP configuration when both the URL and base DN are set.
    #[must_use]
    pub fn ldap_config(&self) -> Option<LdapConfig> {
        let url = self.ldap_url.trim();
        let base_dn = self.ldap_base_dn.trim();
        if url.is_empty() || base_dn.is_empty() {
            return None;
        }

        let config = LdapConfig::builder(url.to_string(), base_dn.to_string())
            .service_account(
                self.ldap_bind_dn.trim().to_string(),
                self.ldap_bind_password.clone(),
            )
            .user_filter(self.ldap_user_filter.trim().to_string())
            .group_base_dn(self.ldap_group_base_dn.trim().to_string())
            .group_filter(self.ldap_group_filter.trim().to_string())
            .required_groups(
                self.ldap_required_groups
                    .split(',')
                    .map(str::to_string)
                    .collect(),
            )
            .start_tls(self.ldap_start_tls)
            .build();
        Some(config)
    }

    /// Returns the OIDC configuration when an issuer URL is set.
    #[must_use]
    pub fn oidc_config(&self) -> Option<OidcConfig> {
        let issuer_url = self.oidc_issuer_url.trim();
        if issuer_url.is_empty() {
            return None;
        }

        let config = OidcConfig::builder(
            issuer_url.to_string(),
            self.oidc_client_id.trim().to_string(),
            self.oidc_client_secret.clone(),
            self.oidc_redirect_url.trim().to_string(),
        )
        .scopes(&self.oidc_scopes)
        .provider_name(self.oidc_provider_name.trim().to_string())
        .required_claim(
            self.oidc_required_claim.clone(),
            self.oidc_required_claim_value.clone(),
        )
        .build();
        Some(config)
    }

    /// Returns the session cookie settings.
    #[must_use]
    pub fn session(&self) -> SessionSettings {
        SessionSettings {
            secure_cookies: self.session_secure_cookies,
            idle_minutes: self.session_idle_minutes,
        }
    }

    /// Returns the admin API settings when a base URL is set.
    #[must_use]
    pub fn admin_api(&self) -> Option<AdminApiSettings> {
        let base_url = self.api_base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return None;
        }
        Some(AdminApiSettings {
            base_url: base_url.to_string(),
            admin_key: self.api_admin_key.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_source(vars).expect("config")
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]);

        assert_eq!(config.bind_addr(), "0.0.0.0:3909");
        assert_eq!(config.base_path(), "");
        assert!(config.password_pair().is_none());
        assert!(config.ldap_config().is_none());
        assert!(config.oidc_config().is_none());
        assert!(config.admin_api().is_none());
        assert_eq!(
            config.session(),
            SessionSettings {
                secure_cookies: false,
                idle_minutes: 480,
            }
        );
    }

    #[test]
    fn reads_server_settings() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("BASE_PATH", "/console/"),
            ("SESSION_SECURE_COOKIES", "true"),
            ("SESSION_IDLE_MINUTES", "30"),
            ("API_BASE_URL", "http://garage:3903/"),
            ("API_ADMIN_KEY", "admin-token"),
        ]);

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.base_path(), "/console");
        assert!(config.session().secure_cookies);
        assert_eq!(config.session().idle_minutes, 30);
        assert_eq!(
            config.admin_api(),
            Some(AdminApiSettings {
                base_url: "http://garage:3903".to_string(),
                admin_key: "admin-token".to_string(),
            })
        );
    }

    #[test]
    fn password_pair_is_trimmed() {
        let config = load(&[("AUTH_USER_PASS", "  admin:$2b$04$abc  ")]);
        assert_eq!(config.password_pair(), Some("admin:$2b$04$abc"));

        let config = load(&[("AUTH_USER_PASS", "   ")]);
        assert!(config.password_pair().is_none());
    }

    #[test]
    fn ldap_requires_url_and_base_dn() {
        let config = load(&[("LDAP_URL", "ldap://ldap.example.org")]);
        assert!(config.ldap_config().is_none());

        let config = load(&[("LDAP_BASE_DN", "dc=example,dc=org")]);
        assert!(config.ldap_config().is_none());
    }

    #[test]
    fn ldap_config_uses_defaults_and_parses_groups() {
        let config = load(&[
            ("LDAP_URL", "ldap://ldap.example.org"),
            ("LDAP_BASE_DN", "dc=example,dc=org"),
            ("LDAP_BIND_DN", "cn=svc,dc=example,dc=org"),
            ("LDAP_BIND_PASSWORD", "svc-password"),
            ("LDAP_REQUIRED_GROUPS", " storage-admins, ,ops,"),
            ("LDAP_START_TLS", "true"),
        ]);

        let ldap = config.ldap_config().expect("ldap");
        assert_eq!(ldap.bind_dn(), Some("cn=svc,dc=example,dc=org"));
        assert_eq!(ldap.bind_password(), "svc-password");
        assert_eq!(
            ldap.user_filter(),
            "(&(objectClass=inetOrgPerson)(uid={{username}}))"
        );
        assert_eq!(
            ldap.group_filter(),
            "(&(objectClass=groupOfNames)(member={{userDN}}))"
        );
        assert_eq!(ldap.group_base_dn(), "dc=example,dc=org");
        assert_eq!(ldap.required_groups(), ["storage-admins", "ops"]);
        assert!(ldap.start_tls());
    }

    #[test]
    fn oidc_present_with_issuer_and_keeps_numeric_client_id() {
        let config = load(&[
            ("OIDC_ISSUER_URL", "https://auth.example.com"),
            ("OIDC_CLIENT_ID", "000123"),
            ("OIDC_CLIENT_SECRET", "secret"),
            (
                "OIDC_REDIRECT_URL",
                "https://console.example.com/api/auth/oidc/callback",
            ),
            ("OIDC_REQUIRED_CLAIM", "groups"),
            ("OIDC_REQUIRED_CLAIM_VALUE", "storage-admins"),
        ]);

        let oidc = config.oidc_config().expect("oidc");
        assert_eq!(oidc.client_id(), "000123");
        assert_eq!(oidc.scopes(), vec!["openid", "profile", "email"]);
        assert_eq!(oidc.provider_name(), "SSO");
        let claim = oidc.required_claim().expect("claim");
        assert_eq!(claim.name(), "groups");
        assert_eq!(claim.value(), "storage-admins");
    }

    #[test]
    fn oidc_custom_scopes_and_name() {
        let config = load(&[
            ("OIDC_ISSUER_URL", "https://auth.example.com"),
            ("OIDC_SCOPES", "openid,groups"),
            ("OIDC_PROVIDER_NAME", "Authentik"),
        ]);

        let oidc = config.oidc_config().expect("oidc");
        assert_eq!(oidc.scopes(), vec!["openid", "groups"]);
        assert_eq!(oidc.provider_name(), "Authentik");
        assert!(oidc.required_claim().is_none());
    }
}
