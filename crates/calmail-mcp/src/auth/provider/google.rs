//! Google OAuth2 Provider
//!
//! Implements the PKCE Authorization Code flow for installed apps against the
//! endpoints named in the client configuration.

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{error, info};

use super::{OAuthProvider, OAuthTokens};
use crate::common::{create_http_client, OAuthError};
use crate::config::ClientConfig;

/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Google OAuth2 provider.
pub struct GoogleProvider {
    client: ClientConfig,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(client: ClientConfig) -> Result<Self, OAuthError> {
        let http = create_http_client()
            .map_err(|e| OAuthError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, http })
    }

    /// POST a form-encoded request and return the response body.
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| OAuthError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::Network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!(%status, "OAuth endpoint error");
            return Err(classify_error(status.as_u16(), &body));
        }

        Ok(body)
    }
}

impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn client(&self) -> &ClientConfig {
        &self.client
    }

    fn authorize_url(
        &self,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
        redirect_uri: &str,
    ) -> String {
        let scope_str = scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}\
             &code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            self.client.auth_uri,
            urlencoding::encode(&self.client.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope_str),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, OAuthError> {
        info!("Exchanging authorization code for tokens");

        let params = [
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let body = self.post_form(&self.client.token_uri, &params).await?;
        parse_token_response(&body)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthTokens, OAuthError> {
        info!("Refreshing access token");

        let params = [
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let body = self.post_form(&self.client.token_uri, &params).await?;
        parse_token_response(&body)
    }

    async fn revoke_token(&self, token: &str) -> Result<(), OAuthError> {
        info!("Revoking token at Google");

        self.post_form(&self.client.revoke_uri, &[("token", token)]).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Parse a Google OAuth2 token response.
fn parse_token_response(body: &str) -> Result<OAuthTokens, OAuthError> {
    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|e| OAuthError::InvalidResponse(e.to_string()))?;

    if parsed.access_token.is_empty() {
        return Err(OAuthError::InvalidResponse("empty access_token".to_string()));
    }

    let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
    let scopes = parsed
        .scope
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default();

    Ok(OAuthTokens {
        access_token: parsed.access_token,
        refresh_token: parsed.refresh_token,
        token_type: parsed.token_type.unwrap_or_else(|| "Bearer".to_string()),
        expires_at: Utc::now() + Duration::seconds(expires_in),
        scopes,
    })
}

/// Map an error body from the token endpoint. `invalid_grant` means the
/// grant is dead and only fresh consent helps.
fn classify_error(status: u16, body: &str) -> OAuthError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) if err.error == "invalid_grant" => {
            OAuthError::Revoked(err.error_description.unwrap_or(err.error))
        }
        Ok(err) => OAuthError::Rejected {
            error: err.error,
            description: err.error_description.unwrap_or_else(|| format!("HTTP {}", status)),
        },
        Err(_) => OAuthError::Rejected {
            error: format!("http_{}", status),
            description: body.to_string(),
        },
    }
}
