//! Directory server connections.
//!
//! `LdapProvider` speaks to the directory through [`DirectoryConnector`] and
//! [`DirectoryConnection`]. [`Ldap3Connector`] is the production
//! implementation on top of the `ldap3` crate.

use async_trait::async_trait;
use garage_console_core::Result;
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::LdapConfig;

/// Time allowed to open the connection, including StartTLS.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side limit on waiting for the reply to a bind, search or unbind.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Server-side time limit sent with every search, in seconds.
pub const SEARCH_TIME_LIMIT_SECS: i32 = 10;

/// Errors talking to the directory server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Could not open the connection or negotiate TLS.
    Connect { details: String },
    /// A bind was rejected or failed.
    Bind { details: String },
    /// A search was rejected or failed.
    Search { details: String },
    /// The connection could not be closed cleanly.
    Unbind { details: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { details } => write!(f, "cannot connect to directory: {details}"),
            Self::Bind { details } => write!(f, "directory bind failed: {details}"),
            Self::Search { details } => write!(f, "directory search failed: {details}"),
            Self::Unbind { details } => write!(f, "directory unbind failed: {details}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// A whole-subtree search that never dereferences aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub filter: String,
    pub attributes: Vec<String>,
    /// Maximum entries to return; `0` means no limit.
    pub size_limit: i32,
    /// Server-side time limit in seconds.
    pub time_limit: i32,
}

/// One entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Returns the values of `name`, empty if the attribute is absent.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Opens connections to the configured directory.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connects to `config.url()`, upgrading with StartTLS when configured.
    async fn connect(&self, config: &LdapConfig)
    -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// An open directory connection. Binds change the identity of the
/// connection for every following operation.
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Performs a simple bind.
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Runs a search and returns the matching entries.
    async fn search(&mut self, request: &SearchRequest)
    -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Closes the connection.
    async fn unbind(&mut self) -> Result<(), DirectoryError>;
}

/// Connects with the `ldap3` crate.
#[derive(Debug, Clone, Copy)]
pub struct Ldap3Connector {
    operation_timeout: Duration,
}

impl Ldap3Connector {
    /// Sets how long each directory operation may wait for its reply.
    #[must_use]
    pub fn with_operation_timeout(operation_timeout: Duration) -> Self {
        Self { operation_timeout }
    }
}

impl Default for Ldap3Connector {
    fn default() -> Self {
        Self::with_operation_timeout(OPERATION_TIMEOUT)
    }
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(
        &self,
        config: &LdapConfig,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(CONNECT_TIMEOUT)
            .set_starttls(config.start_tls());

        let (conn, ldap) = LdapConnAsync::with_settings(settings, config.url())
            .await
            .map_err(|e| DirectoryError::Connect {
                details: e.to_string(),
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver stopped");
            }
        });

        debug!(url = %config.url(), start_tls = config.start_tls(), "connected to directory");
        Ok(Box::new(Ldap3Connection {
            ldap,
            timeout: self.operation_timeout,
        }))
    }
}

struct Ldap3Connection {
    ldap: Ldap,
    timeout: Duration,
}

#[async_trait]
impl DirectoryConnection for Ldap3Connection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.ldap
            .with_timeout(self.timeout)
            .simple_bind(dn, password)
            .await
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Bind {
                details: e.to_string(),
            })?;
        Ok(())
    }

    async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let options = SearchOptions::new()
            .deref(DerefAliases::Never)
            .sizelimit(request.size_limit)
            .timelimit(request.time_limit);

        let (entries, _) = self
            .ldap
            .with_timeout(self.timeout)
            .with_search_options(options)
            .search(
                &request.base,
                Scope::Subtree,
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Search {
                details: e.to_string(),
            })?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.ldap
            .with_timeout(self.timeout)
            .unbind()
            .await
            .map_err(|e| DirectoryError::Unbind {
                details: e.to_string(),
            })?;
        Ok(())
    }
}
