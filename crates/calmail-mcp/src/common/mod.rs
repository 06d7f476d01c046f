//! Common Utilities
//!
//! Shared error types, path resolution and HTTP client construction.

pub mod error;
pub mod http;
pub mod paths;

pub use error::{ApiError, AuthError, ErrorCode, OAuthError, StoreError, ToolError};
pub use http::create_http_client;
