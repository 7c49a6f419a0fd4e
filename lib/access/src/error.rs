//! Error types for the access crate.
//!
//! Every failure a provider can hit (bad input, missing configuration, an
//! unreachable directory, a rejected token) is mapped to one `AuthError`
//! before it leaves the provider. The message carried by each variant is
//! safe to show to the caller; internal detail is logged where the failure
//! is observed and never copied into the message.

use std::fmt;

/// Message shared by every credential rejection so that an unknown user and
/// a wrong password cannot be told apart.
pub const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Coarse classification of an [`AuthError`], used by the HTTP layer to
/// pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Malformed input or a protocol violation (400).
    Validation,
    /// A requested provider is not usable as configured (500).
    Config,
    /// The directory or identity provider failed (500).
    Upstream,
    /// Credential or token verification failed (401).
    Unauthorized,
    /// Identity verified but group or claim policy not satisfied (403).
    Forbidden,
}

impl AuthErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Config | Self::Upstream => 500,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
        }
    }
}

/// Errors returned by login, callback and logout operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed request, missing fields, OIDC state mismatch or a missing
    /// authorization code.
    Validation { message: String },
    /// Password login requested but no usable admin pair is configured.
    Config { message: String },
    /// Could not reach or bind to the directory, identity provider or
    /// session store.
    Upstream { message: String },
    /// Credentials or identity token rejected.
    Unauthorized { message: String },
    /// Authenticated, but not a member of a required group or claim.
    Forbidden { message: String },
}

impl AuthError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// The rejection used for any wrong username, wrong password or unknown
    /// directory user.
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::unauthorized(INVALID_CREDENTIALS)
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::Validation { .. } => AuthErrorKind::Validation,
            Self::Config { .. } => AuthErrorKind::Config,
            Self::Upstream { .. } => AuthErrorKind::Upstream,
            Self::Unauthorized { .. } => AuthErrorKind::Unauthorized,
            Self::Forbidden { .. } => AuthErrorKind::Forbidden,
        }
    }

    /// Returns the caller-safe message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message }
            | Self::Config { message }
            | Self::Upstream { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message } => message,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthError {}
