//! Tool Surface
//!
//! Tool names, their argument parsing into typed facade requests, and the
//! dispatcher that runs them. Parsing is total: a [`ToolCall`] only exists
//! for arguments that passed every check.

pub mod dispatcher;
pub mod params;
pub mod registry;
pub mod validate;

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::Value;

use self::params::{
    bool_or_with_default, ensure_object, optional_string, optional_string_list, optional_string_or,
    optional_u64_or, require_non_empty_or, require_string,
};
use self::validate::{
    ensure_ordered, max_results, parse_timezone, resolve_instant, validate_email, validate_emails,
    validate_subject,
};
use crate::common::ToolError;
use crate::config::Integration;
use crate::google::{EmailQuery, EventPatch, EventQuery, NewEvent, OutgoingEmail};

pub use dispatcher::Dispatcher;
pub use registry::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    CreateEvent,
    ListEvents,
    UpdateEvent,
    DeleteEvent,
    SendEmail,
    ListEmails,
    GetEmail,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        ToolName::CreateEvent,
        ToolName::ListEvents,
        ToolName::UpdateEvent,
        ToolName::DeleteEvent,
        ToolName::SendEmail,
        ToolName::ListEmails,
        ToolName::GetEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateEvent => "createEvent",
            ToolName::ListEvents => "listEvents",
            ToolName::UpdateEvent => "updateEvent",
            ToolName::DeleteEvent => "deleteEvent",
            ToolName::SendEmail => "sendEmail",
            ToolName::ListEmails => "listEmails",
            ToolName::GetEmail => "getEmail",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn integration(&self) -> Integration {
        match self {
            ToolName::CreateEvent
            | ToolName::ListEvents
            | ToolName::UpdateEvent
            | ToolName::DeleteEvent => Integration::Calendar,
            ToolName::SendEmail | ToolName::ListEmails | ToolName::GetEmail => Integration::Email,
        }
    }
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    CreateEvent(NewEvent),
    ListEvents(EventQuery),
    UpdateEvent(EventPatch),
    DeleteEvent { id: String },
    SendEmail(OutgoingEmail),
    ListEmails(EmailQuery),
    GetEmail { id: String },
}

impl ToolCall {
    pub fn parse(tool: ToolName, args: &Value) -> Result<Self, ToolError> {
        ensure_object(args)?;
        match tool {
            ToolName::CreateEvent => parse_create_event(args),
            ToolName::ListEvents => parse_list_events(args),
            ToolName::UpdateEvent => parse_update_event(args),
            ToolName::DeleteEvent => Ok(ToolCall::DeleteEvent {
                id: require_non_empty_or(args, "id", Some("event_id"))?.to_string(),
            }),
            ToolName::SendEmail => parse_send_email(args),
            ToolName::ListEmails => Ok(ToolCall::ListEmails(EmailQuery {
                query: optional_string(args, "query")?
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(String::from),
                max_results: max_results(optional_u64_or(
                    args,
                    "maxResults",
                    Some("max_results"),
                )?)?,
            })),
            ToolName::GetEmail => Ok(ToolCall::GetEmail {
                id: require_non_empty_or(args, "id", Some("message_id"))?.to_string(),
            }),
        }
    }
}

fn optional_timezone(args: &Value) -> Result<Option<Tz>, ToolError> {
    optional_string(args, "timezone")?.map(parse_timezone).transpose()
}

fn optional_text(args: &Value, key: &str) -> Result<Option<String>, ToolError> {
    Ok(optional_string(args, key)?.map(String::from))
}

fn optional_attendees(args: &Value) -> Result<Option<Vec<String>>, ToolError> {
    optional_string_list(args, "attendees")?
        .map(|list| validate_emails("attendees", list))
        .transpose()
}

fn parse_create_event(args: &Value) -> Result<ToolCall, ToolError> {
    let title = require_non_empty_or(args, "title", None)?;
    let timezone = optional_timezone(args)?.unwrap_or(Tz::UTC);

    let start = resolve_instant(
        "start",
        require_non_empty_or(args, "start", Some("start_datetime"))?,
        Some(timezone),
    )?;
    let end = resolve_instant(
        "end",
        require_non_empty_or(args, "end", Some("end_datetime"))?,
        Some(timezone),
    )?;
    ensure_ordered(start, end)?;

    Ok(ToolCall::CreateEvent(NewEvent {
        title: title.to_string(),
        start,
        end,
        timezone,
        attendees: optional_attendees(args)?.unwrap_or_default(),
        description: optional_text(args, "description")?,
        location: optional_text(args, "location")?,
    }))
}

fn parse_list_events(args: &Value) -> Result<ToolCall, ToolError> {
    let timezone = optional_timezone(args)?;
    // Naive bounds without a zone are UTC; the lower bound defaults to now
    let zone = Some(timezone.unwrap_or(Tz::UTC));

    let range_start = match optional_string_or(args, "rangeStart", Some("time_min"))? {
        Some(value) => resolve_instant("rangeStart", value, zone)?,
        None => Utc::now(),
    };
    let range_end = optional_string_or(args, "rangeEnd", Some("time_max"))?
        .map(|value| resolve_instant("rangeEnd", value, zone))
        .transpose()?;
    if let Some(end) = range_end {
        ensure_ordered(range_start, end)?;
    }

    Ok(ToolCall::ListEvents(EventQuery {
        range_start: Some(range_start),
        range_end,
        timezone,
        max_results: max_results(optional_u64_or(args, "maxResults", Some("max_results"))?)?,
    }))
}

fn parse_update_event(args: &Value) -> Result<ToolCall, ToolError> {
    let id = require_non_empty_or(args, "id", Some("event_id"))?;
    let timezone = optional_timezone(args)?;

    let start = optional_string_or(args, "start", Some("start_datetime"))?
        .map(|value| resolve_instant("start", value, timezone))
        .transpose()?;
    let end = optional_string_or(args, "end", Some("end_datetime"))?
        .map(|value| resolve_instant("end", value, timezone))
        .transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        ensure_ordered(start, end)?;
    }

    let patch = EventPatch {
        id: id.to_string(),
        title: optional_text(args, "title")?,
        description: optional_text(args, "description")?,
        location: optional_text(args, "location")?,
        start,
        end,
        timezone,
        attendees: optional_attendees(args)?,
    };

    let changes_nothing = patch.title.is_none()
        && patch.description.is_none()
        && patch.location.is_none()
        && patch.start.is_none()
        && patch.end.is_none()
        && patch.timezone.is_none()
        && patch.attendees.is_none();
    if changes_nothing {
        return Err(ToolError::invalid("updateEvent needs at least one field to change"));
    }

    Ok(ToolCall::UpdateEvent(patch))
}

fn parse_send_email(args: &Value) -> Result<ToolCall, ToolError> {
    let to = optional_string_list(args, "to")?.unwrap_or_default();
    if to.is_empty() {
        return Err(ToolError::invalid("'to' needs at least one recipient"));
    }
    let to = to.iter().map(|a| validate_email(a)).collect::<Result<Vec<_>, _>>()?;

    let subject = require_string(args, "subject")?;
    validate_subject(subject)?;

    Ok(ToolCall::SendEmail(OutgoingEmail {
        to,
        cc: validate_emails("cc", optional_string_list(args, "cc")?.unwrap_or_default())?,
        bcc: validate_emails("bcc", optional_string_list(args, "bcc")?.unwrap_or_default())?,
        subject: subject.to_string(),
        body: require_string(args, "body")?.to_string(),
        html: bool_or_with_default(args, "isHtml", Some("is_html"), false)?,
    }))
}
