//! Authentication for the garage-console management backend.
//!
//! This crate provides:
//! - Three independent login providers: a static admin password, an LDAP
//!   directory bind, and the OIDC authorization-code flow
//! - `AuthGateway`, which owns whichever providers are configured and answers
//!   login, status and logout requests
//! - The error taxonomy every provider failure is mapped to before it reaches
//!   a caller
//!
//! # Session Model
//!
//! Every provider ends in the same place: on success it writes
//! `authenticated = true` and a provider tag into the caller's session through
//! the [`SessionStore`](garage_console_core::SessionStore) capability. Nothing
//! downstream ever asks which provider was used; a request is either
//! authenticated or it is not.
//!
//! # Example
//!
//! ```
//! use garage_console_access::{AuthGateway, PasswordProvider};
//!
//! // With nothing configured the console is open access.
//! let gateway = AuthGateway::new();
//! assert!(!gateway.is_enabled());
//!
//! let hash = bcrypt::hash("secret", 4).expect("hash");
//! let password = PasswordProvider::from_pair(&format!("alice:{hash}")).expect("non-empty pair");
//! let gateway = gateway.with_password(password);
//! assert!(gateway.is_enabled());
//! ```

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod ldap;
pub mod oidc;
pub mod password;
pub mod provider;
pub mod session;
pub mod status;

// Re-export main types at crate root
pub use credentials::Credentials;
pub use error::{AuthError, AuthErrorKind};
pub use gateway::{AuthGateway, LoginSelection};
pub use ldap::{LdapConfig, LdapConfigBuilder, LdapProvider};
pub use oidc::{CallbackParams, OidcConfig, OidcConfigBuilder, OidcError, OidcProvider};
pub use password::PasswordProvider;
pub use provider::{AuthProvider, CredentialProvider};
pub use status::{AuthStatus, ProviderSummary};
