//! Common Error Types
//!
//! Error enums for each layer plus the mapping of tool failures onto
//! JSON-RPC-range codes reported back to the assistant host.

use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

/// Error codes carried in tool error payloads.
///
/// Standard codes: -32768 to -32000
/// Custom codes: -32099 to -32000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MethodNotFound = -32601,
    InvalidParams = -32602,

    // Auth subsystem
    ReauthRequired = -32011,
    TokenRefreshFailed = -32012,
    ConsentFailed = -32014,
    CredentialStore = -32015,

    // Vendor API
    PermissionDenied = -32001,
    Unauthorized = -32002,
    NotFound = -32004,
    RateLimited = -32005,

    GenericError = -32000,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Credential Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no stored credential at {}", .0.display())]
    NotFound(PathBuf),

    #[error("stored credential at {} is unreadable: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize credential: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Corrupt state is indistinguishable from absence for callers.
    pub fn is_absent(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::CorruptState { .. })
    }
}

/// OAuth token endpoint failures.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// `invalid_grant`: the refresh token or code is revoked, expired or already used.
    #[error("grant revoked: {0}")]
    Revoked(String),

    #[error("{error}: {description}")]
    Rejected { error: String, description: String },

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// Authenticator failures surfaced to callers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("re-authorization required: {0}")]
    ReauthRequired(String),

    #[error("user consent failed: {0}")]
    Consent(String),

    #[error("token refresh failed: {0}")]
    TokenEndpoint(#[source] OAuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Google API failures, surfaced verbatim as tool results.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("Google API error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

/// Tool invocation failures.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidArgument(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ToolError::UnknownTool(_) => ErrorCode::MethodNotFound,
            ToolError::InvalidArgument(_) => ErrorCode::InvalidParams,
            ToolError::Auth(e) => match e {
                AuthError::ReauthRequired(_) => ErrorCode::ReauthRequired,
                AuthError::Consent(_) => ErrorCode::ConsentFailed,
                AuthError::TokenEndpoint(_) => ErrorCode::TokenRefreshFailed,
                AuthError::Store(_) => ErrorCode::CredentialStore,
            },
            ToolError::Api(e) => match e {
                ApiError::NotFound(_) => ErrorCode::NotFound,
                ApiError::PermissionDenied(_) => ErrorCode::PermissionDenied,
                ApiError::RateLimited(_) => ErrorCode::RateLimited,
                ApiError::InvalidArgument(_) => ErrorCode::InvalidParams,
                ApiError::Unauthorized(_) => ErrorCode::Unauthorized,
                ApiError::Upstream { .. } | ApiError::Network(_) | ApiError::InvalidResponse(_) => {
                    ErrorCode::GenericError
                }
            },
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::InvalidArgument(_) => "invalid_argument",
            ToolError::Auth(e) => match e {
                AuthError::ReauthRequired(_) => "reauth_required",
                AuthError::Consent(_) => "consent_failed",
                AuthError::TokenEndpoint(_) => "token_refresh_failed",
                AuthError::Store(_) => "credential_store",
            },
            ToolError::Api(e) => match e {
                ApiError::NotFound(_) => "not_found",
                ApiError::PermissionDenied(_) => "permission_denied",
                ApiError::RateLimited(_) => "rate_limited",
                ApiError::InvalidArgument(_) => "invalid_argument",
                ApiError::Unauthorized(_) => "unauthorized",
                ApiError::Upstream { .. } => "upstream",
                ApiError::Network(_) => "network",
                ApiError::InvalidResponse(_) => "invalid_response",
            },
        }
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "error": {
                "code": self.code().code(),
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}
