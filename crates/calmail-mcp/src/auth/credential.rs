//! OAuth credential record.
//!
//! Serialized in Google's `authorized_user` token file layout so token files
//! written by other Google tooling load unchanged.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::provider::OAuthTokens;
use crate::config::{ClientConfig, GOOGLE_TOKEN_URI};

/// Tokens are treated as expired this long before their nominal expiry.
pub const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    #[zeroize(skip)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    #[zeroize(skip)]
    pub scopes: Vec<String>,
    #[zeroize(skip)]
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    #[zeroize(skip)]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

// Redacts secrets
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl Credential {
    /// Build a credential from a fresh authorization-code exchange.
    ///
    /// When the token endpoint does not report granted scopes, the requested
    /// scopes are assumed.
    pub fn from_tokens(
        tokens: &OAuthTokens,
        client: &ClientConfig,
        requested_scopes: &[String],
    ) -> Self {
        let scopes = if tokens.scopes.is_empty() {
            requested_scopes.to_vec()
        } else {
            tokens.scopes.clone()
        };

        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expiry: Some(tokens.expires_at),
            scopes,
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            token_uri: client.token_uri.clone(),
        }
    }

    /// Apply a refresh response in place. Google usually omits the refresh
    /// token on refresh; the existing one is kept then.
    pub fn apply_refresh(&mut self, tokens: &OAuthTokens) {
        self.access_token = tokens.access_token.clone();
        if let Some(refresh) = &tokens.refresh_token {
            self.refresh_token = Some(refresh.clone());
        }
        self.expiry = Some(tokens.expires_at);
        if !tokens.scopes.is_empty() {
            self.scopes = tokens.scopes.clone();
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            // No expiry recorded: the token is used until the API rejects it
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn missing_scopes(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|scope| !self.scopes.contains(scope))
            .cloned()
            .collect()
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        self.missing_scopes(required).is_empty()
    }
}
