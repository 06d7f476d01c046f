//! Typed requests into the facade and the trimmed views returned to the
//! assistant.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;

use super::common::{decode_body_data, extract_array, header_value};
use crate::common::ApiError;

// ── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: Tz,
    pub attendees: Vec<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub timezone: Option<Tz>,
    pub attendees: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    pub timezone: Option<Tz>,
    pub max_results: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub html: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailQuery {
    pub query: Option<String>,
    pub max_results: usize,
}

// ── Responses ───────────────────────────────────────────────────────────────

/// Timed events carry an instant, all-day events a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventTime {
    Instant(DateTime<Utc>),
    AllDay(NaiveDate),
}

impl EventTime {
    fn from_google(value: &Value) -> Option<Self> {
        if let Some(dt) = value.get("dateTime").and_then(|v| v.as_str()) {
            return DateTime::parse_from_rfc3339(dt)
                .ok()
                .map(|dt| EventTime::Instant(dt.with_timezone(&Utc)));
        }
        value
            .get("date")
            .and_then(|v| v.as_str())
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(EventTime::AllDay)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub attendees: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EventSummary {
    pub fn from_google(event: &Value) -> Result<Self, ApiError> {
        let id = str_field(event, "id")
            .ok_or_else(|| ApiError::InvalidResponse("event without id".to_string()))?;

        let start = event.get("start");
        Ok(Self {
            id,
            title: str_field(event, "summary").unwrap_or_else(|| "(No title)".to_string()),
            start: start.and_then(EventTime::from_google),
            end: event.get("end").and_then(EventTime::from_google),
            timezone: start.and_then(|s| str_field(s, "timeZone")),
            attendees: extract_array(event, "attendees")
                .iter()
                .filter_map(|a| str_field(a, "email"))
                .collect(),
            description: str_field(event, "description"),
            location: str_field(event, "location"),
            html_link: str_field(event, "htmlLink"),
            status: str_field(event, "status"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: Option<String>,
    pub subject: String,
    pub from: String,
    pub date: Option<String>,
    pub snippet: Option<String>,
    pub label_ids: Vec<String>,
}

impl EmailSummary {
    pub fn from_google(message: &Value) -> Result<Self, ApiError> {
        let id = str_field(message, "id")
            .ok_or_else(|| ApiError::InvalidResponse("message without id".to_string()))?;
        let headers = message.get("payload").unwrap_or(&Value::Null);

        Ok(Self {
            id,
            thread_id: str_field(message, "threadId"),
            subject: header_value(headers, "Subject").unwrap_or_else(|| "(No Subject)".to_string()),
            from: header_value(headers, "From").unwrap_or_else(|| "(Unknown Sender)".to_string()),
            date: header_value(headers, "Date"),
            snippet: str_field(message, "snippet"),
            label_ids: extract_array(message, "labelIds")
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDetail {
    #[serde(flatten)]
    pub summary: EmailSummary,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub body: String,
    pub body_mime_type: Option<String>,
}

impl EmailDetail {
    pub fn from_google(message: &Value) -> Result<Self, ApiError> {
        let summary = EmailSummary::from_google(message)?;
        let payload = message.get("payload").unwrap_or(&Value::Null);

        let found = find_body(payload, "text/plain").or_else(|| find_body(payload, "text/html"));
        let (body, body_mime_type) = match found {
            Some((body, mime)) => (body, Some(mime)),
            None => (String::new(), None),
        };

        Ok(Self {
            to: header_value(payload, "To"),
            cc: header_value(payload, "Cc"),
            summary,
            body,
            body_mime_type,
        })
    }
}

/// Depth-first search of a MIME tree for the first part of `mime_type`.
fn find_body(part: &Value, mime_type: &str) -> Option<(String, String)> {
    if part.get("mimeType").and_then(|v| v.as_str()) == Some(mime_type) {
        if let Some(data) = part.get("body").and_then(|b| b.get("data")).and_then(|v| v.as_str()) {
            if let Some(text) = decode_body_data(data) {
                return Some((text, mime_type.to_string()));
            }
        }
    }
    extract_array(part, "parts")
        .iter()
        .find_map(|child| find_body(child, mime_type))
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(|v| v.as_str()).map(String::from)
}
