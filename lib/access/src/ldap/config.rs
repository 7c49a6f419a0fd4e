//! LDAP directory configuration.

use std::fmt;

/// Default filter locating a user entry by `uid`.
pub const DEFAULT_USER_FILTER: &str = "(&(objectClass=inetOrgPerson)(uid={{username}}))";

/// Default filter locating the groups a user DN belongs to.
pub const DEFAULT_GROUP_FILTER: &str = "(&(objectClass=groupOfNames)(member={{userDN}}))";

/// Connection and search settings for an LDAP directory.
///
/// Built once at startup and read-only afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct LdapConfig {
    url: String,
    bind_dn: Option<String>,
    bind_password: String,
    base_dn: String,
    user_filter: String,
    group_base_dn: String,
    group_filter: String,
    required_groups: Vec<String>,
    start_tls: bool,
}

impl LdapConfig {
    /// Creates a configuration with defaults for every optional field.
    #[must_use]
    pub fn new(url: String, base_dn: String) -> Self {
        LdapConfigBuilder::new(url, base_dn).build()
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(url: String, base_dn: String) -> LdapConfigBuilder {
        LdapConfigBuilder::new(url, base_dn)
    }

    /// Returns the directory URL (`ldap://` or `ldaps://`).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the service account DN, if one is configured.
    #[must_use]
    pub fn bind_dn(&self) -> Option<&str> {
        self.bind_dn.as_deref()
    }

    /// Returns the service account password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        &self.bind_password
    }

    /// Returns the DN user searches start from.
    #[must_use]
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Returns the user filter template.
    #[must_use]
    pub fn user_filter(&self) -> &str {
        &self.user_filter
    }

    /// Returns the DN group searches start from.
    #[must_use]
    pub fn group_base_dn(&self) -> &str {
        &self.group_base_dn
    }

    /// Returns the group filter template.
    #[must_use]
    pub fn group_filter(&self) -> &str {
        &self.group_filter
    }

    /// Returns the groups of which a user must belong to at least one.
    #[must_use]
    pub fn required_groups(&self) -> &[String] {
        &self.required_groups
    }

    /// Returns true if the connection is upgraded with StartTLS.
    #[must_use]
    pub fn start_tls(&self) -> bool {
        self.start_tls
    }
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("base_dn", &self.base_dn)
            .field("user_filter", &self.user_filter)
            .field("group_base_dn", &self.group_base_dn)
            .field("group_filter", &self.group_filter)
            .field("required_groups", &self.required_groups)
            .field("start_tls", &self.start_tls)
            .finish()
    }
}

/// Builder for `LdapConfig`.
#[derive(Debug)]
pub struct LdapConfigBuilder {
    url: String,
    base_dn: String,
    bind_dn: Option<String>,
    bind_password: String,
    user_filter: Option<String>,
    group_base_dn: Option<String>,
    group_filter: Option<String>,
    required_groups: Vec<String>,
    start_tls: bool,
}

impl LdapConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(url: String, base_dn: String) -> Self {
        Self {
            url,
            base_dn,
            bind_dn: None,
            bind_password: String::new(),
            user_filter: None,
            group_base_dn: None,
            group_filter: None,
            required_groups: Vec::new(),
            start_tls: false,
        }
    }

    /// Sets the service account used for searches. An empty DN means no
    /// service account.
    #[must_use]
    pub fn service_account(mut self, bind_dn: String, bind_password: String) -> Self {
        self.bind_dn = Some(bind_dn).filter(|dn| !dn.is_empty());
        self.bind_password = bind_password;
        self
    }

    /// Sets the user filter template.
    #[must_use]
    pub fn user_filter(mut self, filter: String) -> Self {
        self.user_filter = Some(filter);
        self
    }

    /// Sets the DN group searches start from.
    #[must_use]
    pub fn group_base_dn(mut self, dn: String) -> Self {
        self.group_base_dn = Some(dn);
        self
    }

    /// Sets the group filter template.
    #[must_use]
    pub fn group_filter(mut self, filter: String) -> Self {
        self.group_filter = Some(filter);
        self
    }

    /// Sets the required groups. Names are trimmed and empty names dropped.
    #[must_use]
    pub fn required_groups(mut self, groups: Vec<String>) -> Self {
        self.required_groups = groups
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        self
    }

    /// Enables or disables StartTLS.
    #[must_use]
    pub fn start_tls(mut self, enabled: bool) -> Self {
        self.start_tls = enabled;
        self
    }

    /// Builds the `LdapConfig`.
    #[must_use]
    pub fn build(self) -> LdapConfig {
        let group_base_dn = self
            .group_base_dn
            .filter(|dn| !dn.is_empty())
            .unwrap_or_else(|| self.base_dn.clone());

        LdapConfig {
            url: self.url,
            bind_dn: self.bind_dn,
            bind_password: self.bind_password,
            base_dn: self.base_dn,
            user_filter: self
                .user_filter
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_FILTER.to_string()),
            group_base_dn,
            group_filter: self
                .group_filter
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_GROUP_FILTER.to_string()),
            required_groups: self.required_groups,
            start_tls: self.start_tls,
        }
    }
}
