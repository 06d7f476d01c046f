//! Google API Authenticated HTTP Client
//!
//! Injects the OAuth bearer token, handles pagination, and maps Google's
//! error envelope onto [`ApiError`].

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::common::ApiError;

/// Google API HTTP client with OAuth token injection
pub struct GoogleClient {
    client: Client,
    access_token: Zeroizing<String>,
}

impl GoogleClient {
    /// Wrap a shared `reqwest::Client` with an access token.
    pub fn new(client: Client, access_token: &str) -> Self {
        Self {
            client,
            access_token: Zeroizing::new(access_token.to_string()),
        }
    }

    /// Make an authenticated GET request
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let builder = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(self.access_token.as_str());

        self.execute_request(builder).await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let builder = self
            .client
            .post(url)
            .bearer_auth(self.access_token.as_str())
            .json(body);

        self.execute_request(builder).await
    }

    /// Make an authenticated PUT request with JSON body
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let builder = self
            .client
            .put(url)
            .bearer_auth(self.access_token.as_str())
            .json(body);

        self.execute_request(builder).await
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, url: &str) -> Result<Value, ApiError> {
        let builder = self.client.delete(url).bearer_auth(self.access_token.as_str());

        self.execute_request(builder).await
    }

    /// Execute a request and handle Google API response patterns
    async fn execute_request(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        debug!("Executing Google API request");

        let response = builder.send().await.map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let err = classify_error(status, &body);
            error!(%status, error = %err, "Google API error");
            return Err(err);
        }

        // Empty successful responses (e.g., DELETE)
        if body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{} (body: {})", e, body)))
    }

    /// Handle paginated requests with nextPageToken
    ///
    /// `field` names the array holding the page's items.
    pub async fn get_paginated(
        &self,
        url: &str,
        base_query: &[(&str, String)],
        field: &str,
        max_results: usize,
    ) -> Result<Vec<Value>, ApiError> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = base_query.to_vec();
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }
            query.push(("maxResults", (max_results - all_items.len()).to_string()));

            let response = self.get(url, &query).await?;

            if let Some(items) = response.get(field).and_then(|v| v.as_array()) {
                all_items.extend(items.iter().cloned());
            }

            if all_items.len() >= max_results {
                all_items.truncate(max_results);
                break;
            }

            match response.get("nextPageToken").and_then(|v| v.as_str()) {
                Some(next_token) => page_token = Some(next_token.to_string()),
                None => break,
            }
        }

        Ok(all_items)
    }
}

/// Map a non-success response onto the facade's error taxonomy.
///
/// Google reports errors as
/// `{"error": {"code": 403, "message": "...", "errors": [{"reason": "..."}]}}`.
pub fn classify_error(status: StatusCode, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error_obj = parsed.as_ref().and_then(|v| v.get("error"));

    let message = error_obj
        .and_then(|e| e.get("message").and_then(|v| v.as_str()).map(String::from))
        .or_else(|| {
            // OAuth-style `{"error": "invalid_token", "error_description": "..."}`
            parsed.as_ref().and_then(|v| {
                v.get("error_description")
                    .or_else(|| v.get("error"))
                    .and_then(|v| v.as_str())
                    .map(String::from)
            })
        })
        .unwrap_or_else(|| format!("HTTP {} error", status));

    let reason = error_obj
        .and_then(|e| e.get("errors"))
        .and_then(|v| v.as_array())
        .and_then(|errors| errors.first())
        .and_then(|e| e.get("reason"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limited by Google API");
            ApiError::RateLimited(message)
        }
        StatusCode::FORBIDDEN if is_rate_limit_reason(reason) => {
            warn!(reason, "Rate limited by Google API");
            ApiError::RateLimited(message)
        }
        StatusCode::FORBIDDEN => ApiError::PermissionDenied(message),
        StatusCode::NOT_FOUND | StatusCode::GONE => ApiError::NotFound(message),
        StatusCode::BAD_REQUEST => ApiError::InvalidArgument(message),
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
        _ => ApiError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

fn is_rate_limit_reason(reason: &str) -> bool {
    matches!(
        reason,
        "rateLimitExceeded" | "userRateLimitExceeded" | "quotaExceeded" | "dailyLimitExceeded"
    )
}
