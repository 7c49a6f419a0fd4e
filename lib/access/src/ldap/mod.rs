//! LDAP directory login.
//!
//! A login runs bind/search/bind against the directory:
//! 1. Connect, and bind as the service account if one is configured
//! 2. Search for the user entry with the escaped username
//! 3. Bind as that entry with the submitted password
//! 4. Optionally re-bind as the service account and check group membership
//!
//! Unknown users and wrong passwords produce the same rejection. Directory
//! DNs and the service account only ever appear in logs.

pub mod config;
pub mod directory;
pub mod filter;

pub use config::{LdapConfig, LdapConfigBuilder};
pub use directory::{
    DirectoryConnection, DirectoryConnector, DirectoryEntry, DirectoryError, Ldap3Connector,
    SearchRequest,
};

use async_trait::async_trait;
use garage_console_core::SessionStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::provider::{AuthProvider, CredentialProvider};
use crate::session::mark_authenticated;

use directory::SEARCH_TIME_LIMIT_SECS;

/// Authenticates users against an LDAP directory.
#[derive(Clone)]
pub struct LdapProvider {
    config: LdapConfig,
    connector: Arc<dyn DirectoryConnector>,
}

impl LdapProvider {
    /// Creates a provider that connects with `ldap3`.
    #[must_use]
    pub fn new(config: LdapConfig) -> Self {
        Self::with_connector(config, Arc::new(Ldap3Connector::default()))
    }

    /// Creates a provider that connects through `connector`.
    #[must_use]
    pub fn with_connector(config: LdapConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self { config, connector }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if credentials.username().trim().is_empty() || credentials.password().trim().is_empty() {
            return Err(AuthError::validation("username and password are required"));
        }

        let mut conn = self.connector.connect(&self.config).await.map_err(|report| {
            error!(error = %report, "cannot connect to LDAP server");
            AuthError::upstream("cannot connect to LDAP server")
        })?;

        let outcome = self.run(conn.as_mut(), credentials).await;

        if let Err(report) = conn.unbind().await {
            debug!(error = %report, "LDAP unbind failed");
        }

        outcome
    }

    async fn run(
        &self,
        conn: &mut dyn DirectoryConnection,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        self.bind_service_account(conn, "LDAP service bind failed")
            .await?;

        let user_dn = self.find_user(conn, credentials.username()).await?;

        if let Err(report) = conn.bind(&user_dn, credentials.password()).await {
            debug!(error = %report, "LDAP user bind rejected");
            return Err(AuthError::invalid_credentials());
        }

        if !self.config.required_groups().is_empty() {
            self.check_groups(conn, &user_dn, credentials.username())
                .await?;
        }

        Ok(())
    }

    async fn bind_service_account(
        &self,
        conn: &mut dyn DirectoryConnection,
        message: &'static str,
    ) -> Result<(), AuthError> {
        let Some(bind_dn) = self.config.bind_dn() else {
            return Ok(());
        };

        conn.bind(bind_dn, self.config.bind_password())
            .await
            .map_err(|report| {
                error!(error = %report, step = message, "LDAP service account bind failed");
                AuthError::upstream(message)
            })
    }

    async fn find_user(
        &self,
        conn: &mut dyn DirectoryConnection,
        username: &str,
    ) -> Result<String, AuthError> {
        let request = SearchRequest {
            base: self.config.base_dn().to_string(),
            filter: filter::user_filter(self.config.user_filter(), username),
            attributes: vec!["dn".to_string()],
            size_limit: 1,
            time_limit: SEARCH_TIME_LIMIT_SECS,
        };

        let entries = conn.search(&request).await.map_err(|report| {
            error!(error = %report, "LDAP user search failed");
            AuthError::upstream("LDAP search failed")
        })?;

        match entries.into_iter().next() {
            Some(entry) => {
                debug!(user_dn = %entry.dn, "LDAP user entry found");
                Ok(entry.dn)
            }
            None => {
                debug!("no LDAP entry matched the user filter");
                Err(AuthError::invalid_credentials())
            }
        }
    }

    async fn check_groups(
        &self,
        conn: &mut dyn DirectoryConnection,
        user_dn: &str,
        username: &str,
    ) -> Result<(), AuthError> {
        // The user bind may not be allowed to read groups.
        self.bind_service_account(conn, "LDAP service rebind failed")
            .await?;

        let request = SearchRequest {
            base: self.config.group_base_dn().to_string(),
            filter: filter::group_filter(self.config.group_filter(), user_dn, username),
            attributes: vec!["cn".to_string()],
            size_limit: 0,
            time_limit: SEARCH_TIME_LIMIT_SECS,
        };

        let entries = conn.search(&request).await.map_err(|report| {
            error!(error = %report, "LDAP group search failed");
            AuthError::upstream("LDAP group search failed")
        })?;

        let member_of: HashSet<&str> = entries
            .iter()
            .flat_map(|entry| entry.values("cn"))
            .map(String::as_str)
            .filter(|cn| !cn.is_empty())
            .collect();

        let allowed = self
            .config
            .required_groups()
            .iter()
            .any(|group| member_of.contains(group.as_str()));

        if allowed {
            Ok(())
        } else {
            debug!(groups = ?member_of, "user is in none of the required groups");
            Err(AuthError::forbidden(
                "access denied: user is not a member of any required group",
            ))
        }
    }
}

#[async_trait]
impl CredentialProvider for LdapProvider {
    fn kind(&self) -> AuthProvider {
        AuthProvider::Ldap
    }

    #[instrument(skip_all, fields(provider = "ldap", username = %credentials.username()))]
    async fn attempt_login(
        &self,
        credentials: &Credentials,
        session: &dyn SessionStore,
    ) -> Result<(), AuthError> {
        if let Err(err) = self.authenticate(credentials).await {
            warn!(error = %err, "LDAP login rejected");
            return Err(err);
        }

        mark_authenticated(session, self.kind()).await?;
        info!("LDAP login succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthErrorKind;
    use crate::session::is_authenticated;
    use garage_console_core::MemorySession;
    use ldap3::ldap_escape;
    use std::sync::Mutex;

    const BASE_DN: &str = "dc=example,dc=org";
    const SERVICE_DN: &str = "cn=svc,dc=example,dc=org";
    const SERVICE_PASSWORD: &str = "svc-password";

    #[derive(Clone)]
    struct FakeUser {
        uid: &'static str,
        dn: &'static str,
        password: &'static str,
    }

    #[derive(Clone)]
    struct FakeGroup {
        cn: &'static str,
        members: Vec<&'static str>,
    }

    /// In-memory directory understanding the default filter templates.
    #[derive(Default)]
    struct FakeDirectory {
        users: Vec<FakeUser>,
        groups: Vec<FakeGroup>,
        unreachable: bool,
        binds: Arc<Mutex<Vec<String>>>,
        searches: Arc<Mutex<Vec<SearchRequest>>>,
    }

    impl FakeDirectory {
        fn example() -> Self {
            Self {
                users: vec![
                    FakeUser {
                        uid: "alice",
                        dn: "uid=alice,ou=people,dc=example,dc=org",
                        password: "wonderland",
                    },
                    FakeUser {
                        uid: "bob",
                        dn: "uid=bob,ou=people,dc=example,dc=org",
                        password: "builder",
                    },
                ],
                groups: vec![FakeGroup {
                    cn: "storage-admins",
                    members: vec!["uid=alice,ou=people,dc=example,dc=org"],
                }],
                ..Default::default()
            }
        }

        fn searches(&self) -> Vec<SearchRequest> {
            self.searches.lock().expect("lock").clone()
        }

        fn binds(&self) -> Vec<String> {
            self.binds.lock().expect("lock").clone()
        }
    }

    struct FakeConnection {
        users: Vec<FakeUser>,
        groups: Vec<FakeGroup>,
        binds: Arc<Mutex<Vec<String>>>,
        searches: Arc<Mutex<Vec<SearchRequest>>>,
    }

    #[async_trait]
    impl DirectoryConnector for FakeDirectory {
        async fn connect(
            &self,
            _config: &LdapConfig,
        ) -> garage_console_core::Result<Box<dyn DirectoryConnection>, DirectoryError> {
            if self.unreachable {
                return Err(DirectoryError::Connect {
                    details: "connection refused".to_string(),
                }
                .into());
            }
            Ok(Box::new(FakeConnection {
                users: self.users.clone(),
                groups: self.groups.clone(),
                binds: self.binds.clone(),
                searches: self.searches.clone(),
            }))
        }
    }

    #[async_trait]
    impl DirectoryConnection for FakeConnection {
        async fn bind(
            &mut self,
            dn: &str,
            password: &str,
        ) -> garage_console_core::Result<(), DirectoryError> {
            self.binds.lock().expect("lock").push(dn.to_string());
            let service = dn == SERVICE_DN && password == SERVICE_PASSWORD;
            let user = self
                .users
                .iter()
                .any(|u| u.dn == dn && u.password == password);
            if service || user {
                Ok(())
            } else {
                Err(DirectoryError::Bind {
                    details: "invalidCredentials (49)".to_string(),
                }
                .into())
            }
        }

        async fn search(
            &mut self,
            request: &SearchRequest,
        ) -> garage_console_core::Result<Vec<DirectoryEntry>, DirectoryError> {
            self.searches.lock().expect("lock").push(request.clone());

            let users = self.users.iter().filter(|u| {
                request.filter
                    == format!(
                        "(&(objectClass=inetOrgPerson)(uid={}))",
                        ldap_escape(u.uid)
                    )
            });
            let groups = self.groups.iter().filter(|g| {
                g.members.iter().any(|member| {
                    request.filter
                        == format!(
                            "(&(objectClass=groupOfNames)(member={}))",
                            ldap_escape(*member)
                        )
                })
            });

            let mut entries: Vec<DirectoryEntry> = users
                .map(|u| DirectoryEntry {
                    dn: u.dn.to_string(),
                    ..Default::default()
                })
                .collect();
            entries.extend(groups.map(|g| {
                let mut entry = DirectoryEntry {
                    dn: format!("cn={},ou=groups,{BASE_DN}", g.cn),
                    ..Default::default()
                };
                entry
                    .attributes
                    .insert("cn".to_string(), vec![g.cn.to_string()]);
                entry
            }));
            Ok(entries)
        }

        async fn unbind(&mut self) -> garage_console_core::Result<(), DirectoryError> {
            Ok(())
        }
    }

    fn config(required_groups: &[&str]) -> LdapConfig {
        LdapConfig::builder("ldap://ldap.example.org".to_string(), BASE_DN.to_string())
            .service_account(SERVICE_DN.to_string(), SERVICE_PASSWORD.to_string())
            .required_groups(required_groups.iter().map(|g| g.to_string()).collect())
            .build()
    }

    fn provider(directory: Arc<FakeDirectory>, required_groups: &[&str]) -> LdapProvider {
        LdapProvider::with_connector(config(required_groups), directory)
    }

    #[tokio::test]
    async fn valid_credentials_authenticate_session() {
        let directory = Arc::new(FakeDirectory::example());
        let provider = provider(directory.clone(), &[]);
        let session = MemorySession::new();

        provider
            .attempt_login(&Credentials::new("alice", "wonderland"), &session)
            .await
            .expect("login");

        assert!(is_authenticated(&session).await);
        assert_eq!(
            directory.binds(),
            [SERVICE_DN, "uid=alice,ou=people,dc=example,dc=org"]
        );

        let searches = directory.searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].base, BASE_DN);
        assert_eq!(searches[0].size_limit, 1);
        assert_eq!(searches[0].time_limit, 10);
        assert_eq!(searches[0].attributes, ["dn"]);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let directory = Arc::new(FakeDirectory::example());
        let provider = provider(directory, &[]);
        let session = MemorySession::new();

        let unknown = provider
            .attempt_login(&Credentials::new("mallory", "wonderland"), &session)
            .await
            .expect_err("unknown user");
        let wrong = provider
            .attempt_login(&Credentials::new("alice", "looking-glass"), &session)
            .await
            .expect_err("wrong password");

        assert_eq!(unknown, wrong);
        assert_eq!(unknown.kind(), AuthErrorKind::Unauthorized);
        assert!(!unknown.message().contains("dc=example"));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn filter_injection_does_not_match_other_entries() {
        let directory = Arc::new(FakeDirectory::example());
        let provider = provider(directory.clone(), &[]);
        let session = MemorySession::new();

        let err = provider
            .attempt_login(&Credentials::new("*)(uid=*", "wonderland"), &session)
            .await
            .expect_err("injection must not match");

        assert_eq!(err.kind(), AuthErrorKind::Unauthorized);
        let searches = directory.searches();
        assert_eq!(searches.len(), 1);
        assert!(!searches[0].filter.contains('*'));
        assert_eq!(searches[0].size_limit, 1);
        assert!(!is_authenticated(&session).await);
    }

    #[tokio::test]
    async fn member_of_required_group_is_allowed() {
        let directory = Arc::new(FakeDirectory::example());
        let provider = provider(directory.clone(), &["storage-admins", "auditors"]);
        let session = MemorySession::new();

        provider
            .attempt_login(&Credentials::new("alice", "wonderland"), &session)
            .await
            .expect("login");

        assert!(is_authenticated(&session).await);
        // Service bind, user bind, service rebind before the group search.
        assert_eq!(
            directory.binds(),
            [
                SERVICE_DN,
                "uid=alice,ou=people,dc=example,dc=org",
                SERVICE_DN
            ]
        );
        let searches = directory.searches();
        assert_eq!(searches.len(), 2);
        assert_eq!(searches[1].attributes, ["cn"]);
        assert_eq!(searches[1].size_limit, 0);
    }

    #[tokio::test]
    async fn non_member_is_forbidden_and_stays_unauthenticated() {
        let directory = Arc::new(FakeDirectory::example());
        let provider = provider(directory, &["storage-admins"]);
        let session = MemorySession::new();

        let err = provider
            .attempt_login(&Credentials::new("bob", "builder"), &session)
            .await
            .expect_err("bob is not an admin");

        assert_eq!(err.kind(), AuthErrorKind::Forbidden);
        assert!(!is_authenticated(&session).await);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn unreachable_directory_is_upstream_error() {
        let directory = Arc::new(FakeDirectory {
            unreachable: true,
            ..FakeDirectory::example()
        });
        let provider = provider(directory, &[]);
        let session = MemorySession::new();

        let err = provider
            .attempt_login(&Credentials::new("alice", "wonderland"), &session)
            .await
            .expect_err("unreachable");

        assert_eq!(err.kind(), AuthErrorKind::Upstream);
        assert!(!err.message().contains("refused"));
    }

    #[tokio::test]
    async fn failed_service_bind_is_upstream_error() {
        let directory = Arc::new(FakeDirectory::example());
        let config = LdapConfig::builder("ldap://ldap.example.org".to_string(), BASE_DN.to_string())
            .service_account(SERVICE_DN.to_string(), "stale-password".to_string())
            .build();
        let provider = LdapProvider::with_connector(config, directory);
        let session = MemorySession::new();

        let err = provider
            .attempt_login(&Credentials::new("alice", "wonderland"), &session)
            .await
            .expect_err("service bind fails");

        assert_eq!(err.kind(), AuthErrorKind::Upstream);
        assert!(!err.message().contains(SERVICE_DN));
    }

    #[tokio::test]
    async fn empty_password_is_rejected_before_contacting_directory() {
        let directory = Arc::new(FakeDirectory::example());
        let provider = provider(directory.clone(), &[]);
        let session = MemorySession::new();

        let err = provider
            .attempt_login(&Credentials::new("alice", "  "), &session)
            .await
            .expect_err("empty password");

        assert_eq!(err.kind(), AuthErrorKind::Validation);
        assert!(directory.binds().is_empty());
    }

    #[tokio::test]
    async fn anonymous_search_skips_service_bind() {
        let directory = Arc::new(FakeDirectory::example());
        let config = LdapConfig::new("ldap://ldap.example.org".to_string(), BASE_DN.to_string());
        let provider = LdapProvider::with_connector(config, directory.clone());
        let session = MemorySession::new();

        provider
            .attempt_login(&Credentials::new("bob", "builder"), &session)
            .await
            .expect("login");

        assert_eq!(directory.binds(), ["uid=bob,ou=people,dc=example,dc=org"]);
    }
}
