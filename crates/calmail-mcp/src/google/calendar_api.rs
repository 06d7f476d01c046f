//! Google Calendar API v3 Client
//!
//! Events on the user's primary calendar:
//! - List events in a time range
//! - Create/update/delete events

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::GoogleClient;
use super::types::{EventPatch, EventQuery, NewEvent};
use crate::common::ApiError;

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const CALENDAR_ID: &str = "primary";

pub struct CalendarApi {
    client: GoogleClient,
    base_url: String,
}

super::google_api_wrapper!(CalendarApi);

impl CalendarApi {
    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, CALENDAR_ID)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// List single (expanded) events ordered by start time.
    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<Value>, ApiError> {
        info!("Listing events for calendar: {}", CALENDAR_ID);

        let mut params = vec![
            ("orderBy", "startTime".to_string()),
            ("singleEvents", "true".to_string()),
        ];
        if let Some(min) = query.range_start {
            params.push(("timeMin", rfc3339(min)));
        }
        if let Some(max) = query.range_end {
            params.push(("timeMax", rfc3339(max)));
        }
        if let Some(tz) = query.timezone {
            params.push(("timeZone", tz.name().to_string()));
        }

        let events = self
            .client
            .get_paginated(&self.events_url(), &params, "items", query.max_results)
            .await?;

        debug!("Retrieved {} events", events.len());
        Ok(events)
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Value, ApiError> {
        info!("Fetching event: {}", event_id);
        self.client.get(&self.event_url(event_id), &[]).await
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<Value, ApiError> {
        info!("Creating event: {} in calendar: {}", event.title, CALENDAR_ID);

        let mut body = json!({
            "summary": event.title,
            "start": event_time(event.start, event.timezone),
            "end": event_time(event.end, event.timezone),
        });
        if let Some(desc) = &event.description {
            body["description"] = json!(desc);
        }
        if let Some(loc) = &event.location {
            body["location"] = json!(loc);
        }
        if !event.attendees.is_empty() {
            body["attendees"] = attendee_list(&event.attendees);
        }

        let response = self.client.post(&self.events_url(), &body).await?;
        info!("Event created successfully");
        Ok(response)
    }

    /// Fetch the event, overwrite the given fields, PUT it back.
    pub async fn update_event(&self, patch: &EventPatch) -> Result<Value, ApiError> {
        info!("Updating event: {} in calendar: {}", patch.id, CALENDAR_ID);

        let mut event = self.get_event(&patch.id).await?;
        apply_patch(&mut event, patch);

        let response = self.client.put(&self.event_url(&patch.id), &event).await?;
        info!("Event updated successfully");
        Ok(response)
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), ApiError> {
        info!("Deleting event: {} from calendar: {}", event_id, CALENDAR_ID);

        self.client.delete(&self.event_url(event_id)).await?;

        info!("Event deleted successfully");
        Ok(())
    }
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Google's timed `start`/`end` object: wall-clock time in the named zone.
fn event_time(instant: DateTime<Utc>, tz: Tz) -> Value {
    json!({
        "dateTime": instant.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Secs, false),
        "timeZone": tz.name(),
    })
}

fn attendee_list(emails: &[String]) -> Value {
    Value::Array(emails.iter().map(|email| json!({ "email": email })).collect())
}

/// Zone of an existing `start`/`end` object, if it names a valid one.
fn existing_zone(event: &Value, field: &str) -> Option<Tz> {
    event
        .get(field)
        .and_then(|t| t.get("timeZone"))
        .and_then(|v| v.as_str())
        .and_then(|name| name.parse().ok())
}

fn apply_patch(event: &mut Value, patch: &EventPatch) {
    if let Some(title) = &patch.title {
        event["summary"] = json!(title);
    }
    if let Some(desc) = &patch.description {
        event["description"] = json!(desc);
    }
    if let Some(loc) = &patch.location {
        event["location"] = json!(loc);
    }
    if let Some(attendees) = &patch.attendees {
        event["attendees"] = attendee_list(attendees);
    }

    for (field, instant) in [("start", patch.start), ("end", patch.end)] {
        let tz = patch
            .timezone
            .or_else(|| existing_zone(event, field))
            .unwrap_or(Tz::UTC);
        match instant {
            Some(instant) => event[field] = event_time(instant, tz),
            None => {
                // Re-label an existing timed value into the new zone
                if let Some(tz) = patch.timezone {
                    let current = event
                        .get(field)
                        .and_then(|t| t.get("dateTime"))
                        .and_then(|v| v.as_str())
                        .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok());
                    if let Some(current) = current {
                        event[field] = event_time(current.with_timezone(&Utc), tz);
                    }
                }
            }
        }
    }
}
