//! OAuth Provider Abstraction
//!
//! Authorization URL construction, code exchange, refresh and revocation
//! behind a trait so the Authenticator can run against a fake in tests.

pub mod google;
pub mod pkce;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::OAuthError;
use crate::config::ClientConfig;

/// Tokens returned from an OAuth token exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    /// Granted scopes; empty when the endpoint did not report them.
    pub scopes: Vec<String>,
}

/// OAuth provider trait.
#[allow(async_fn_in_trait)]
pub trait OAuthProvider {
    /// Provider name (e.g. "google")
    fn name(&self) -> &str;

    /// Client identity credentials are issued to.
    fn client(&self) -> &ClientConfig;

    /// Build the authorization URL for the PKCE flow.
    fn authorize_url(
        &self,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
        redirect_uri: &str,
    ) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, OAuthError>;

    /// Refresh an access token using a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthTokens, OAuthError>;

    /// Revoke a token at the provider.
    async fn revoke_token(&self, token: &str) -> Result<(), OAuthError>;
}
