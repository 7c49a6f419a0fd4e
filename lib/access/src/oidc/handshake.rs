//! State carried between the authorization redirect and the callback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Secrets issued by `begin_handshake`, stored in the client session until
/// the callback consumes them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHandshake {
    /// The CSRF state echoed back by the provider.
    pub state: String,
    /// The nonce the ID token must carry.
    pub nonce: String,
    pub pkce_verifier: String,
}

impl fmt::Debug for PendingHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingHandshake")
            .field("state", &self.state)
            .field("nonce", &"<redacted>")
            .field("pkce_verifier", &"<redacted>")
            .finish()
    }
}

/// Query parameters of the OIDC callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Describes why no code was returned, preferring the provider's own
    /// description.
    #[must_use]
    pub fn failure_reason(&self) -> &str {
        self.error_description
            .as_deref()
            .filter(|d| !d.is_empty())
            .or_else(|| self.error.as_deref().filter(|e| !e.is_empty()))
            .unwrap_or("no authorization code received")
    }
}

/// Progress of a single login through the authorization-code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    NotStarted,
    StateIssued,
    CallbackValidated,
    TokenExchanged,
    ClaimsVerified,
    Authenticated,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::StateIssued => "state_issued",
            Self::CallbackValidated => "callback_validated",
            Self::TokenExchanged => "token_exchanged",
            Self::ClaimsVerified => "claims_verified",
            Self::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}
