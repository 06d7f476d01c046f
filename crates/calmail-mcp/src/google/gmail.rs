//! Gmail API v1 Client
//!
//! - List/search messages
//! - Get message details
//! - Send emails

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::GoogleClient;
use super::types::{EmailQuery, OutgoingEmail};
use crate::common::ApiError;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

const METADATA_HEADERS: [&str; 4] = ["Subject", "From", "To", "Date"];

pub struct GmailApi {
    client: GoogleClient,
    base_url: String,
}

super::google_api_wrapper!(GmailApi);

impl GmailApi {
    /// List messages matching a query, each with its metadata headers.
    ///
    /// The list endpoint only returns ids, so every hit costs one more GET.
    pub async fn list_messages(&self, query: &EmailQuery) -> Result<Vec<Value>, ApiError> {
        info!("Listing Gmail messages");

        let mut params = vec![];
        if let Some(q) = &query.query {
            params.push(("q", q.clone()));
        }

        let url = format!("{}/users/me/messages", self.base_url);
        let ids = self
            .client
            .get_paginated(&url, &params, "messages", query.max_results)
            .await?;

        let mut messages = Vec::with_capacity(ids.len());
        for entry in &ids {
            let Some(id) = entry.get("id").and_then(|v| v.as_str()) else {
                continue;
            };
            messages.push(self.get_message(id, "metadata").await?);
        }

        debug!("Retrieved {} messages", messages.len());
        Ok(messages)
    }

    /// Get a message by ID
    ///
    /// `format` is one of "full", "metadata", "minimal", "raw".
    pub async fn get_message(&self, id: &str, format: &str) -> Result<Value, ApiError> {
        debug!("Fetching Gmail message: {}", id);

        let mut params = vec![("format", format.to_string())];
        if format == "metadata" {
            for header in METADATA_HEADERS {
                params.push(("metadataHeaders", header.to_string()));
            }
        }

        let url = format!("{}/users/me/messages/{}", self.base_url, urlencoding::encode(id));
        self.client.get(&url, &params).await
    }

    pub async fn send_message(&self, email: &OutgoingEmail) -> Result<Value, ApiError> {
        info!("Sending Gmail message to {} recipient(s)", email.to.len());

        let raw = build_raw_message(email);
        let request_body = json!({ "raw": base64_url_encode(raw.as_bytes()) });

        let url = format!("{}/users/me/messages/send", self.base_url);
        let response = self.client.post(&url, &request_body).await?;

        info!("Message sent successfully");
        Ok(response)
    }
}

/// Build an RFC 2822 message. Gmail strips the `Bcc` header on send.
pub fn build_raw_message(email: &OutgoingEmail) -> String {
    let mut headers = vec![format!("To: {}", email.to.join(", "))];
    if !email.cc.is_empty() {
        headers.push(format!("Cc: {}", email.cc.join(", ")));
    }
    if !email.bcc.is_empty() {
        headers.push(format!("Bcc: {}", email.bcc.join(", ")));
    }
    headers.push(format!("Subject: {}", encode_header(&email.subject)));
    headers.push("MIME-Version: 1.0".to_string());

    let subtype = if email.html { "html" } else { "plain" };
    headers.push(format!("Content-Type: text/{}; charset=UTF-8", subtype));
    headers.push("Content-Transfer-Encoding: 8bit".to_string());

    format!("{}\r\n\r\n{}", headers.join("\r\n"), email.body)
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Base64url encode (no padding) per RFC 4648 §5
fn base64_url_encode(data: &[u8]) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    URL_SAFE_NO_PAD.encode(data)
}
