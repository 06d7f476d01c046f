//! Interactive user consent.
//!
//! The consent step is the one place the server waits on a human: a browser
//! visits the provider's consent page and is redirected back to a loopback
//! listener carrying the authorization code. There is no timeout; the caller
//! cancels at the process level.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::provider::pkce::PkceFlow;
use super::provider::OAuthProvider;
use crate::common::AuthError;

/// Everything needed to exchange an authorization code for tokens.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

#[allow(async_fn_in_trait)]
pub trait ConsentProvider {
    /// Obtain an authorization code for `scopes`, blocking until the user acts.
    async fn obtain_grant<P: OAuthProvider>(
        &self,
        provider: &P,
        scopes: &[String],
    ) -> Result<AuthorizationGrant, AuthError>;
}

/// Browser consent via a loopback redirect (RFC 8252).
#[derive(Debug, Clone)]
pub struct LoopbackConsent {
    /// 0 picks a free port.
    port: u16,
    open_browser: bool,
}

impl LoopbackConsent {
    pub fn new(port: u16, open_browser: bool) -> Self {
        Self { port, open_browser }
    }
}

impl Default for LoopbackConsent {
    fn default() -> Self {
        Self::new(0, true)
    }
}

impl ConsentProvider for LoopbackConsent {
    async fn obtain_grant<P: OAuthProvider>(
        &self,
        provider: &P,
        scopes: &[String],
    ) -> Result<AuthorizationGrant, AuthError> {
        let pkce = PkceFlow::new();

        let host = provider.client().redirect_host();
        let bind_host = if host == "localhost" { "127.0.0.1" } else { host.as_str() };
        let listener = TcpListener::bind((bind_host, self.port))
            .await
            .map_err(|e| {
                AuthError::Consent(format!(
                    "failed to bind loopback listener on {}:{}: {}",
                    bind_host, self.port, e
                ))
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Consent(format!("loopback listener has no address: {}", e)))?
            .port();

        let uri_host = if host.contains(':') { format!("[{}]", host) } else { host.clone() };
        let redirect_uri = format!("http://{}:{}/", uri_host, port);
        let auth_url = provider.authorize_url(scopes, &pkce.state, &pkce.challenge, &redirect_uri);

        info!(provider = provider.name(), port, "awaiting user consent");
        debug!("authorization URL: {}", auth_url);

        // stdout carries the protocol; the operator prompt goes to stderr
        eprintln!(
            "\nPlease authorize access by opening this URL in your browser:\n\n{}\n",
            auth_url
        );
        if self.open_browser {
            if let Err(e) = open::that(&auth_url) {
                warn!("failed to open browser: {}", e);
            }
        }

        let code = await_callback(&listener, &pkce.state).await?;
        info!("received authorization code");

        Ok(AuthorizationGrant {
            code,
            code_verifier: pkce.verifier,
            redirect_uri,
        })
    }
}

/// Accept connections until one carries the OAuth redirect; return its code.
pub async fn await_callback(
    listener: &TcpListener,
    expected_state: &str,
) -> Result<String, AuthError> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| {
                AuthError::Consent(format!("failed to accept callback connection: {}", e))
            })?;
        debug!(%peer, "callback connection");

        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await.is_err() {
            continue;
        }
        let mut stream = reader.into_inner();

        let Some(outcome) = parse_callback(&request_line) else {
            let _ = stream.write_all(NOT_FOUND.as_bytes()).await;
            continue;
        };

        let outcome = outcome.and_then(|params| {
            if params.state == expected_state {
                Ok(params.code)
            } else {
                Err(AuthError::Consent("OAuth state mismatch - possible CSRF attack".to_string()))
            }
        });

        let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
        let _ = stream.write_all(page.as_bytes()).await;
        let _ = stream.flush().await;

        return outcome;
    }
}

#[derive(Debug, PartialEq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// Parse `GET /?code=...&state=... HTTP/1.1`. `None` for unrelated requests
/// such as `/favicon.ico`.
pub fn parse_callback(request_line: &str) -> Option<Result<CallbackParams, AuthError>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let query = target.split_once('?').map(|(_, q)| q)?;

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(&value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(AuthError::Consent(format!("authorization denied: {}", error))));
    }

    let code = code?;
    Some(Ok(CallbackParams {
        code,
        state: state.unwrap_or_default(),
    }))
}

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\n\
Content-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
<html><body><h1>Authorization Successful</h1>\
<p>You can close this window and return to your assistant.</p></body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\n\
Content-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
<html><body><h1>Authorization Failed</h1>\
<p>You can close this window.</p></body></html>";

const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
