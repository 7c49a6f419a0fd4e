//! OpenID Connect login using the authorization-code flow.
//!
//! The provider metadata (endpoints and signing keys) is discovered once when
//! the provider is built. The signing keys are fetched again when an ID token
//! names a key the provider does not know. Each login then runs through:
//! 1. `begin_handshake`: issue a CSRF state, an ID token nonce and a PKCE
//!    verifier, park them in the session and redirect to the provider
//! 2. `complete_handshake`: consume the parked state, exchange the code,
//!    verify the ID token and apply the optional claim requirement

pub mod claims;
pub mod config;
pub mod handshake;

pub use claims::RequiredClaim;
pub use config::{OidcConfig, OidcConfigBuilder};
pub use handshake::{CallbackParams, HandshakeStage, PendingHandshake};

use garage_console_core::{SessionKey, SessionStore};
use openidconnect::core::{
    CoreAuthenticationFlow, CoreClient, CoreIdToken, CoreJsonWebKeySet, CoreProviderMetadata,
};
use openidconnect::url::Url;
use openidconnect::{
    AuthorizationCode, ClaimsVerificationError, ClientId, ClientSecret, CsrfToken,
    EndpointMaybeSet, EndpointNotSet, EndpointSet, IssuerUrl, Nonce, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, SignatureVerificationError,
    TokenResponse,
};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::AuthError;
use crate::provider::AuthProvider;
use crate::session::mark_authenticated;

/// Timeout for every request to the identity provider.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const OPENID_SCOPE: &str = "openid";

/// Errors building an [`OidcProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OidcError {
    /// Invalid URLs or HTTP client setup.
    Configuration { details: String },
    /// The issuer metadata could not be fetched or parsed.
    Discovery { details: String },
}

impl fmt::Display for OidcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "OIDC configuration error: {details}"),
            Self::Discovery { details } => write!(f, "OIDC discovery error: {details}"),
        }
    }
}

impl std::error::Error for OidcError {}

/// Client for an external OpenID Connect provider.
#[derive(Clone)]
pub struct OidcProvider {
    config: OidcConfig,
    metadata: CoreProviderMetadata,
    /// Signing keys, replaced when the provider rotates them.
    jwks: Arc<RwLock<CoreJsonWebKeySet>>,
    client_id: ClientId,
    client_secret: ClientSecret,
    redirect_url: RedirectUrl,
    http_client: reqwest::Client,
}

impl OidcProvider {
    /// Builds the provider by discovering the issuer metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured URL is invalid, or if discovery does
    /// not complete within [`HTTP_TIMEOUT`].
    #[instrument(skip_all, fields(issuer = %config.issuer_url()))]
    pub async fn discover(config: OidcConfig) -> garage_console_core::Result<Self, OidcError> {
        let issuer_url =
            IssuerUrl::new(config.issuer_url().to_string()).map_err(|e| {
                OidcError::Configuration {
                    details: format!("invalid issuer URL: {e}"),
                }
            })?;
        let http_client = http_client()?;

        let metadata = tokio::time::timeout(
            HTTP_TIMEOUT,
            CoreProviderMetadata::discover_async(issuer_url, &http_client),
        )
        .await
        .map_err(|_| OidcError::Discovery {
            details: format!("timed out after {}s", HTTP_TIMEOUT.as_secs()),
        })?
        .map_err(|e| OidcError::Discovery {
            details: e.to_string(),
        })?;

        info!("discovered OIDC provider metadata");
        Self::with_client(config, metadata, http_client)
    }

    /// Builds the provider from already-resolved metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URL is invalid.
    pub fn from_metadata(
        config: OidcConfig,
        metadata: CoreProviderMetadata,
    ) -> garage_console_core::Result<Self, OidcError> {
        let http_client = http_client()?;
        Self::with_client(config, metadata, http_client)
    }

    fn with_client(
        config: OidcConfig,
        metadata: CoreProviderMetadata,
        http_client: reqwest::Client,
    ) -> garage_console_core::Result<Self, OidcError> {
        let redirect_url = RedirectUrl::new(config.redirect_url().to_string()).map_err(|e| {
            OidcError::Configuration {
                details: format!("invalid redirect URL: {e}"),
            }
        })?;

        Ok(Self {
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            redirect_url,
            jwks: Arc::new(RwLock::new(metadata.jwks().clone())),
            metadata,
            http_client,
            config,
        })
    }

    /// Returns the display name of the provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.config.provider_name()
    }

    /// Starts a login: parks fresh handshake secrets in the session and
    /// returns the URL to redirect the browser to.
    ///
    /// A previous pending handshake in the same session is replaced.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the session store rejects the write.
    #[instrument(skip_all, fields(provider = "oidc"))]
    pub async fn begin_handshake(&self, session: &dyn SessionStore) -> Result<Url, AuthError> {
        let client = self.client(self.signing_keys());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        // openid is always sent by the client itself.
        for scope in self.config.scopes() {
            if scope != OPENID_SCOPE {
                request = request.add_scope(Scope::new(scope.to_string()));
            }
        }

        let (url, csrf_token, nonce) = request.url();

        let pending = PendingHandshake {
            state: csrf_token.secret().clone(),
            nonce: nonce.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };
        let value = serde_json::to_value(&pending).map_err(|e| {
            error!(error = %e, "cannot encode pending handshake");
            AuthError::upstream("session store unavailable")
        })?;
        session
            .set_value(SessionKey::OidcState, value)
            .await
            .map_err(|report| {
                error!(error = %report, "cannot store pending handshake");
                AuthError::upstream("session store unavailable")
            })?;

        debug!(stage = %HandshakeStage::StateIssued, "redirecting to identity provider");
        Ok(url)
    }

    /// Finishes a login from the provider's callback.
    ///
    /// The pending handshake is removed from the session before anything is
    /// compared, so a state value is accepted at most once.
    ///
    /// # Errors
    ///
    /// - `Validation` when no handshake is pending, the state differs, or
    ///   the provider returned no code
    /// - `Unauthorized` when the code exchange or ID token verification fails
    /// - `Forbidden` when the required claim is not satisfied
    #[instrument(skip_all, fields(provider = "oidc"))]
    pub async fn complete_handshake(
        &self,
        session: &dyn SessionStore,
        params: &CallbackParams,
    ) -> Result<(), AuthError> {
        let pending = take_pending(session).await?;

        if params.state.as_deref() != Some(pending.state.as_str()) {
            warn!(stage = %HandshakeStage::NotStarted, "OIDC callback state mismatch");
            return Err(AuthError::validation("state mismatch"));
        }

        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            let reason = params.failure_reason();
            warn!(reason, "OIDC callback carried no authorization code");
            return Err(AuthError::validation(format!("OIDC error: {reason}")));
        };
        debug!(stage = %HandshakeStage::CallbackValidated, "callback state accepted");

        let client = self.client(self.signing_keys());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| {
                error!(error = %e, "identity provider has no token endpoint");
                AuthError::unauthorized("token exchange failed")
            })?;

        let token_response = token_request
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier))
            .request_async(&self.http_client)
            .await
            .map_err(|e| {
                warn!(error = %e, "authorization code exchange failed");
                AuthError::unauthorized("token exchange failed")
            })?;
        debug!(stage = %HandshakeStage::TokenExchanged, "authorization code exchanged");

        let verification_failed = |reason: &str| {
            warn!(reason, "ID token rejected");
            AuthError::unauthorized("token verification failed")
        };

        let id_token = token_response
            .id_token()
            .ok_or_else(|| verification_failed("no ID token in response"))?;

        let nonce = Nonce::new(pending.nonce);
        let verified = match self.verify(id_token, &nonce, self.signing_keys()) {
            Err(ClaimsVerificationError::SignatureVerification(
                SignatureVerificationError::NoMatchingKey,
            )) => match self.refresh_signing_keys().await {
                Some(jwks) => self.verify(id_token, &nonce, jwks),
                None => Err(ClaimsVerificationError::SignatureVerification(
                    SignatureVerificationError::NoMatchingKey,
                )),
            },
            other => other,
        };
        verified.map_err(|e| verification_failed(&e.to_string()))?;

        // Custom claims are not part of the typed claim set, so read them
        // from the verified token's payload.
        let raw_token = serde_json::to_value(id_token)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| verification_failed("cannot serialize ID token"))?;
        let claims =
            claims::decode_payload(&raw_token).map_err(|e| verification_failed(&e.to_string()))?;

        if let Some(required) = self.config.required_claim() {
            if !required.is_satisfied_by(&claims) {
                warn!(claim = required.name(), "required claim not satisfied");
                return Err(AuthError::forbidden(
                    "access denied: required claim not satisfied",
                ));
            }
        }
        debug!(stage = %HandshakeStage::ClaimsVerified, "ID token verified");

        mark_authenticated(session, AuthProvider::Oidc).await?;
        info!(stage = %HandshakeStage::Authenticated, "OIDC login succeeded");
        Ok(())
    }
}

impl OidcProvider {
    fn client(
        &self,
        jwks: CoreJsonWebKeySet,
    ) -> CoreClient<
        EndpointSet,
        EndpointNotSet,
        EndpointNotSet,
        EndpointNotSet,
        EndpointMaybeSet,
        EndpointMaybeSet,
    > {
        CoreClient::from_provider_metadata(
            self.metadata.clone().set_jwks(jwks),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone())
    }

    fn signing_keys(&self) -> CoreJsonWebKeySet {
        self.jwks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn verify(
        &self,
        id_token: &CoreIdToken,
        nonce: &Nonce,
        jwks: CoreJsonWebKeySet,
    ) -> Result<(), ClaimsVerificationError> {
        let client = self.client(jwks);
        id_token
            .claims(&client.id_token_verifier(), nonce)
            .map(|_| ())
    }

    /// Fetches the signing keys again from the provider's JWKS endpoint.
    async fn refresh_signing_keys(&self) -> Option<CoreJsonWebKeySet> {
        match CoreJsonWebKeySet::fetch_async(self.metadata.jwks_uri(), &self.http_client).await {
            Ok(jwks) => {
                *self.jwks.write().unwrap_or_else(PoisonError::into_inner) = jwks.clone();
                info!(keys = jwks.keys().len(), "refreshed OIDC signing keys");
                Some(jwks)
            }
            Err(e) => {
                warn!(error = %e, "cannot refresh OIDC signing keys");
                None
            }
        }
    }
}

impl fmt::Debug for OidcProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn http_client() -> garage_console_core::Result<reqwest::Client, OidcError> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| OidcError::Configuration {
            details: format!("failed to create HTTP client: {e}"),
        })?;
    Ok(client)
}

/// Removes the pending handshake from the session.
async fn take_pending(session: &dyn SessionStore) -> Result<PendingHandshake, AuthError> {
    let stored = session
        .remove_value(SessionKey::OidcState)
        .await
        .map_err(|report| {
            error!(error = %report, "cannot read pending handshake");
            AuthError::upstream("session store unavailable")
        })?;

    let Some(value) = stored else {
        debug!(stage = %HandshakeStage::NotStarted, "callback without pending handshake");
        return Err(AuthError::validation("no state in session"));
    };

    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "pending handshake in session is unreadable");
        AuthError::validation("no state in session")
    })
}
