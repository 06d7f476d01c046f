//! Shared utilities for the Calendar and Gmail modules.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

/// Extract an array field from a JSON response, returning an empty vec if missing.
///
/// Google APIs return lists under varying field names ("items", "messages",
/// "attendees", "parts").
pub fn extract_array(response: &Value, field: &str) -> Vec<Value> {
    response
        .get(field)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Case-insensitive lookup in a Gmail `payload.headers` list.
pub fn header_value(payload: &Value, name: &str) -> Option<String> {
    extract_array(payload, "headers").iter().find_map(|h| {
        let header_name = h.get("name")?.as_str()?;
        if header_name.eq_ignore_ascii_case(name) {
            h.get("value")?.as_str().map(String::from)
        } else {
            None
        }
    })
}

/// Decode Gmail's base64url body data, which may or may not be padded.
pub fn decode_body_data(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
