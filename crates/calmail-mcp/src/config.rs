//! Configuration
//!
//! The OAuth client configuration (loaded once from the operator-provided
//! client secret file) and the per-integration settings the server runs with.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::paths;

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_REVOKE_URI: &str = "https://oauth2.googleapis.com/revoke";

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1";

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read client secret file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse client secret JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "client secret file must contain an 'installed'/'web' section \
         or top-level client_id/client_secret"
    )]
    MissingClient,

    #[error("could not resolve calmail home directory: {0}")]
    Home(String),
}

/// Which Google product a server instance fronts. Each integration has its
/// own scopes, token file and tool set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Integration {
    Calendar,
    Email,
}

impl Integration {
    pub fn name(&self) -> &'static str {
        match self {
            Integration::Calendar => "calendar",
            Integration::Email => "email",
        }
    }

    /// OAuth scopes every credential for this integration must carry.
    pub fn scopes(&self) -> Vec<String> {
        match self {
            Integration::Calendar => vec![CALENDAR_SCOPE.to_string()],
            Integration::Email => {
                vec![GMAIL_SEND_SCOPE.to_string(), GMAIL_READONLY_SCOPE.to_string()]
            }
        }
    }

    pub fn token_file_name(&self) -> &'static str {
        match self {
            Integration::Calendar => "calendar_token.json",
            Integration::Email => "email_token.json",
        }
    }
}

impl fmt::Display for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// OAuth client identity. Immutable once loaded.
#[derive(Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorized redirect target registered for the client (loopback for desktop apps).
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub revoke_uri: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("revoke_uri", &self.revoke_uri)
            .finish()
    }
}

/// Google Cloud Console client secret file, nested or flat.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            revoke_uri: GOOGLE_REVOKE_URI.to_string(),
        }
    }

    /// Point token and revoke calls at another server (tests, proxies).
    pub fn with_token_endpoints(
        mut self,
        token_uri: impl Into<String>,
        revoke_uri: impl Into<String>,
    ) -> Self {
        self.token_uri = token_uri.into();
        self.revoke_uri = revoke_uri.into();
        self
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: ClientSecretFile = serde_json::from_str(json)?;

        if let Some(section) = file.installed.or(file.web) {
            let mut config = Self::new(section.client_id, section.client_secret);
            if let Some(uri) = section.redirect_uris.into_iter().next() {
                config.redirect_uri = uri;
            }
            if let Some(uri) = section.auth_uri {
                config.auth_uri = uri;
            }
            if let Some(uri) = section.token_uri {
                config.token_uri = uri;
            }
            return Ok(config);
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ConfigError::MissingClient),
        }
    }

    /// Host part of the registered redirect target, used to bind the loopback listener.
    pub fn redirect_host(&self) -> String {
        url::Url::parse(&self.redirect_uri)
            .ok()
            .and_then(|u| {
                u.host_str()
                    .map(|h| h.trim_matches(|c| c == '[' || c == ']').to_string())
            })
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }
}

/// Resolved file locations for one server instance.
#[derive(Debug, Clone)]
pub struct Settings {
    pub integration: Integration,
    pub home: PathBuf,
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
}

impl Settings {
    pub fn resolve(
        integration: Integration,
        home: Option<PathBuf>,
        client_secret: Option<PathBuf>,
        token_file: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let home = match home {
            Some(dir) => dir,
            None => paths::calmail_dir().map_err(ConfigError::Home)?,
        };
        let client_secret_path = client_secret.unwrap_or_else(|| paths::client_secret_path(&home));
        let token_path = token_file.unwrap_or_else(|| paths::token_path(&home, integration));

        Ok(Self {
            integration,
            home,
            client_secret_path,
            token_path,
        })
    }
}
