use serde_json::{json, Value};

use super::ToolName;
use crate::config::Integration;
use crate::protocol::{McpTool, ToolAnnotations, ToolsListResponse};

/// Tools advertised by one integration.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    integration: Integration,
    tools: Vec<McpTool>,
}

impl ToolRegistry {
    pub fn for_integration(integration: Integration) -> Self {
        let tools = ToolName::ALL
            .iter()
            .filter(|tool| tool.integration() == integration)
            .map(|tool| definition(*tool))
            .collect();
        Self { integration, tools }
    }

    pub fn integration(&self) -> Integration {
        self.integration
    }

    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// Resolve a tool name; tools of the other integration do not exist here.
    pub fn resolve(&self, name: &str) -> Option<ToolName> {
        ToolName::from_name(name).filter(|tool| tool.integration() == self.integration)
    }

    pub fn list_response(&self) -> ToolsListResponse {
        ToolsListResponse {
            tools: self.tools.clone(),
        }
    }
}

fn annotations(read_only: bool, destructive: bool, idempotent: bool) -> ToolAnnotations {
    ToolAnnotations {
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: true,
    }
}

fn tool(
    name: ToolName,
    description: &str,
    input_schema: Value,
    annotations: ToolAnnotations,
) -> McpTool {
    McpTool {
        name: name.as_str().to_string(),
        description: description.to_string(),
        input_schema,
        annotations,
    }
}

const DATETIME_HELP: &str =
    "Local date and time in the event timezone (e.g. 2024-12-25T10:00) or RFC 3339 with offset";

const UPDATE_DATETIME_HELP: &str = "RFC 3339 with offset, or local date and time \
    (e.g. 2024-12-25T10:00) together with timezone; the event's current zone is not used";

fn definition(name: ToolName) -> McpTool {
    match name {
        ToolName::CreateEvent => tool(
            name,
            "Create an event on the primary Google Calendar",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Event title"},
                    "start": {"type": "string", "description": DATETIME_HELP},
                    "end": {"type": "string", "description": DATETIME_HELP},
                    "timezone": {
                        "type": "string",
                        "description": "IANA time zone (e.g. Asia/Kolkata)",
                        "default": "UTC"
                    },
                    "attendees": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Attendee email addresses"
                    },
                    "description": {"type": "string", "description": "Event description"},
                    "location": {"type": "string", "description": "Event location"}
                },
                "required": ["title", "start", "end"]
            }),
            annotations(false, false, false),
        ),
        ToolName::ListEvents => tool(
            name,
            "List upcoming events on the primary Google Calendar, ordered by start time",
            json!({
                "type": "object",
                "properties": {
                    "rangeStart": {
                        "type": "string",
                        "description": "Lower bound on event end time (defaults to now)"
                    },
                    "rangeEnd": {
                        "type": "string",
                        "description": "Upper bound on event start time"
                    },
                    "timezone": {
                        "type": "string",
                        "description": "IANA time zone for naive bounds and returned events"
                    },
                    "maxResults": {"type": "integer", "minimum": 1, "maximum": 250, "default": 10}
                }
            }),
            annotations(true, false, true),
        ),
        ToolName::UpdateEvent => tool(
            name,
            "Update fields of an existing calendar event; omitted fields are left unchanged",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Event ID"},
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "location": {"type": "string"},
                    "start": {"type": "string", "description": UPDATE_DATETIME_HELP},
                    "end": {"type": "string", "description": UPDATE_DATETIME_HELP},
                    "timezone": {
                        "type": "string",
                        "description": "IANA time zone; required when start or end has no offset"
                    },
                    "attendees": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Replaces the attendee list"
                    }
                },
                "required": ["id"]
            }),
            annotations(false, false, true),
        ),
        ToolName::DeleteEvent => tool(
            name,
            "Delete an event from the primary Google Calendar",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Event ID"}
                },
                "required": ["id"]
            }),
            annotations(false, true, true),
        ),
        ToolName::SendEmail => tool(
            name,
            "Send an email via Gmail",
            json!({
                "type": "object",
                "properties": {
                    "to": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Recipient addresses"
                    },
                    "subject": {"type": "string"},
                    "body": {"type": "string"},
                    "cc": {"type": "array", "items": {"type": "string"}},
                    "bcc": {"type": "array", "items": {"type": "string"}},
                    "isHtml": {
                        "type": "boolean",
                        "default": false,
                        "description": "Send the body as HTML"
                    }
                },
                "required": ["to", "subject", "body"]
            }),
            annotations(false, false, false),
        ),
        ToolName::ListEmails => tool(
            name,
            "List recent emails, optionally filtered by a Gmail search query",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Gmail search query (e.g. from:someone@example.com)"
                    },
                    "maxResults": {"type": "integer", "minimum": 1, "maximum": 250, "default": 10}
                }
            }),
            annotations(true, false, true),
        ),
        ToolName::GetEmail => tool(
            name,
            "Get headers and body of one email",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Message ID"}
                },
                "required": ["id"]
            }),
            annotations(true, false, true),
        ),
    }
}
