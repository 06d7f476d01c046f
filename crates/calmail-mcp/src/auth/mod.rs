//! Authenticator
//!
//! Owns the OAuth2 credential lifecycle for one integration:
//!
//! ```text
//! Unauthenticated ──► AwaitingUserConsent ──► Authorized ◄──► Expired
//!        ▲                     ▲                               │
//!        │                     └────────── Revoked ◄───────────┘
//!        └──────────── logout ─────────────────────────────────┘
//! ```
//!
//! The store, the token endpoint and the consent step are injected so the
//! machine can be driven entirely by fakes.

pub mod consent;
pub mod credential;
pub mod provider;
pub mod store;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use self::consent::ConsentProvider;
use self::credential::Credential;
use self::provider::OAuthProvider;
use self::store::CredentialStore;
use crate::common::{AuthError, OAuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    AwaitingUserConsent,
    Authorized,
    Expired,
    Revoked,
}

/// Snapshot reported by `calmail-mcp status`. Carries no secrets.
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub state: AuthState,
    pub scopes: Vec<String>,
    pub missing_scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
}

/// What the tool dispatcher needs from the auth layer.
#[allow(async_fn_in_trait)]
pub trait CredentialSource {
    async fn ensure_valid_credential(&mut self) -> Result<Credential, AuthError>;

    /// The API rejected the current access token.
    fn mark_expired(&mut self);
}

pub struct Authenticator<S, P, C> {
    store: S,
    provider: P,
    consent: C,
    scopes: Vec<String>,
    state: watch::Sender<AuthState>,
    current: Option<Credential>,
}

impl<S, P, C> Authenticator<S, P, C>
where
    S: CredentialStore,
    P: OAuthProvider,
    C: ConsentProvider,
{
    pub fn new(store: S, provider: P, consent: C, scopes: Vec<String>) -> Self {
        Self {
            store,
            provider,
            consent,
            scopes,
            state: watch::channel(AuthState::Unauthenticated).0,
            current: None,
        }
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Follow state transitions, including those made while a call is
    /// blocked on consent.
    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: AuthState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "auth state changed");
        }
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Return a credential that is unexpired and carries every required
    /// scope, refreshing or running consent as needed. With a valid
    /// credential already in memory this touches neither disk nor network.
    pub async fn ensure_valid_credential(&mut self) -> Result<Credential, AuthError> {
        if self.current.is_none() && self.state() != AuthState::Revoked {
            self.load_stored()?;
        }

        let Some(credential) = self.current.as_ref() else {
            return self.run_consent().await;
        };

        let missing = credential.missing_scopes(&self.scopes);
        if !missing.is_empty() {
            info!(?missing, "credential lacks required scopes, re-running consent");
            return self.run_consent().await;
        }

        if !credential.is_expired() {
            self.set_state(AuthState::Authorized);
            return Ok(credential.clone());
        }

        self.set_state(AuthState::Expired);
        if !credential.can_refresh() {
            info!("credential expired without a refresh token, re-running consent");
            return self.run_consent().await;
        }

        let credential = credential.clone();
        self.refresh(credential).await
    }

    /// Run consent unconditionally, replacing any stored credential.
    pub async fn authorize_interactively(&mut self) -> Result<Credential, AuthError> {
        self.current = None;
        self.run_consent().await
    }

    /// Revoke at the provider (best effort) and clear the store.
    pub async fn revoke(&mut self) -> Result<(), AuthError> {
        let credential = match self.current.take() {
            Some(credential) => Some(credential),
            None => match self.store.load() {
                Ok(credential) => Some(credential),
                Err(e) if e.is_absent() => None,
                Err(e) => return Err(e.into()),
            },
        };

        if let Some(credential) = credential {
            // Revoking the refresh token also kills its access tokens
            let token = match credential.refresh_token.as_deref() {
                Some(refresh) if !refresh.is_empty() => refresh,
                _ => credential.access_token.as_str(),
            };
            if let Err(e) = self.provider.revoke_token(token).await {
                warn!(error = %e, "provider revocation failed, clearing local credential anyway");
            }
        }

        self.store.clear()?;
        self.set_state(AuthState::Unauthenticated);
        info!("credential revoked");
        Ok(())
    }

    pub fn mark_expired(&mut self) {
        if let Some(credential) = self.current.as_mut() {
            credential.expiry = Some(Utc::now());
            self.set_state(AuthState::Expired);
            debug!("credential marked expired");
        }
    }

    pub fn status(&mut self) -> Result<AuthStatus, AuthError> {
        if self.current.is_none() && self.state() != AuthState::Revoked {
            self.load_stored()?;
        }

        Ok(match self.current.as_ref() {
            Some(credential) => AuthStatus {
                state: self.state(),
                scopes: credential.scopes.clone(),
                missing_scopes: credential.missing_scopes(&self.scopes),
                expiry: credential.expiry,
                has_refresh_token: credential.can_refresh(),
            },
            None => AuthStatus {
                state: self.state(),
                scopes: Vec::new(),
                missing_scopes: self.scopes.clone(),
                expiry: None,
                has_refresh_token: false,
            },
        })
    }

    fn load_stored(&mut self) -> Result<(), AuthError> {
        match self.store.load() {
            Ok(credential) => {
                self.set_state(if credential.is_expired() {
                    AuthState::Expired
                } else {
                    AuthState::Authorized
                });
                self.current = Some(credential);
                Ok(())
            }
            Err(e) if e.is_absent() => {
                debug!(error = %e, "no usable stored credential");
                self.set_state(AuthState::Unauthenticated);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh(&mut self, mut credential: Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential.refresh_token.clone().unwrap_or_default();

        match self.provider.refresh_token(&refresh_token).await {
            Ok(tokens) => {
                credential.apply_refresh(&tokens);
                self.store.save(&credential)?;
                info!(expiry = ?credential.expiry, "access token refreshed");
                self.current = Some(credential.clone());
                self.set_state(AuthState::Authorized);
                Ok(credential)
            }
            Err(OAuthError::Revoked(reason)) => {
                warn!(%reason, "refresh token revoked by provider");
                self.current = None;
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to clear revoked credential");
                }
                self.set_state(AuthState::Revoked);
                Err(AuthError::ReauthRequired(format!(
                    "refresh token is no longer valid ({}); \
                     the next request starts a new consent flow",
                    reason
                )))
            }
            Err(e) => {
                error!(error = %e, "token refresh failed");
                Err(AuthError::TokenEndpoint(e))
            }
        }
    }

    async fn run_consent(&mut self) -> Result<Credential, AuthError> {
        self.set_state(AuthState::AwaitingUserConsent);
        info!(provider = self.provider.name(), scopes = ?self.scopes, "awaiting user consent");

        let grant = match self.consent.obtain_grant(&self.provider, &self.scopes).await {
            Ok(grant) => grant,
            Err(e) => {
                self.set_state(AuthState::Unauthenticated);
                return Err(e);
            }
        };

        let tokens = match self
            .provider
            .exchange_code(&grant.code, &grant.code_verifier, &grant.redirect_uri)
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                self.set_state(AuthState::Unauthenticated);
                return Err(AuthError::Consent(format!(
                    "authorization code exchange failed: {}",
                    e
                )));
            }
        };

        let credential = Credential::from_tokens(&tokens, self.provider.client(), &self.scopes);
        let missing = credential.missing_scopes(&self.scopes);
        if !missing.is_empty() {
            self.set_state(AuthState::Unauthenticated);
            return Err(AuthError::ReauthRequired(format!(
                "consent did not grant required scopes: {}",
                missing.join(", ")
            )));
        }

        if let Err(e) = self.store.save(&credential) {
            self.set_state(AuthState::Unauthenticated);
            return Err(e.into());
        }

        info!("authorization complete");
        self.current = Some(credential.clone());
        self.set_state(AuthState::Authorized);
        Ok(credential)
    }
}

impl<S, P, C> CredentialSource for Authenticator<S, P, C>
where
    S: CredentialStore,
    P: OAuthProvider,
    C: ConsentProvider,
{
    async fn ensure_valid_credential(&mut self) -> Result<Credential, AuthError> {
        Authenticator::ensure_valid_credential(self).await
    }

    fn mark_expired(&mut self) {
        Authenticator::mark_expired(self)
    }
}
