//! Tool Dispatcher
//!
//! `invoke` runs in three steps, each gating the next: validate arguments,
//! obtain a credential, call the facade. Malformed input never reaches the
//! auth layer or the network.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{ToolCall, ToolRegistry};
use crate::auth::credential::Credential;
use crate::auth::CredentialSource;
use crate::common::{ApiError, ToolError};
use crate::config::Integration;
use crate::google::{EmailDetail, EmailSummary, EventSummary, WorkspaceApi};

pub struct Dispatcher<C, A> {
    registry: ToolRegistry,
    auth: C,
    api: A,
}

impl<C, A> Dispatcher<C, A>
where
    C: CredentialSource,
    A: WorkspaceApi,
{
    pub fn new(integration: Integration, auth: C, api: A) -> Self {
        Self {
            registry: ToolRegistry::for_integration(integration),
            auth,
            api,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn auth(&self) -> &C {
        &self.auth
    }

    pub async fn invoke(&mut self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let tool = self
            .registry
            .resolve(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let call = ToolCall::parse(tool, args).inspect_err(|e| {
            debug!(tool = name, error = %e, "rejected tool arguments");
        })?;

        let credential = self.auth.ensure_valid_credential().await?;

        info!(tool = name, "invoking tool");
        match self.execute(&credential, call).await {
            Err(ToolError::Api(ApiError::Unauthorized(message))) => {
                warn!(tool = name, "access token rejected, marking credential expired");
                self.auth.mark_expired();
                Err(ApiError::Unauthorized(message).into())
            }
            other => other,
        }
    }

    async fn execute(&self, credential: &Credential, call: ToolCall) -> Result<Value, ToolError> {
        match call {
            ToolCall::CreateEvent(event) => {
                let created = self.api.create_event(credential, &event).await?;
                to_json(&EventSummary::from_google(&created)?)
            }
            ToolCall::ListEvents(query) => {
                let events = self
                    .api
                    .list_events(credential, &query)
                    .await?
                    .iter()
                    .map(EventSummary::from_google)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({ "count": events.len(), "events": to_json(&events)? }))
            }
            ToolCall::UpdateEvent(patch) => {
                let updated = self.api.update_event(credential, &patch).await?;
                to_json(&EventSummary::from_google(&updated)?)
            }
            ToolCall::DeleteEvent { id } => {
                self.api.delete_event(credential, &id).await?;
                Ok(json!({ "deleted": true, "id": id }))
            }
            ToolCall::SendEmail(email) => {
                let sent = self.api.send_email(credential, &email).await?;
                Ok(json!({
                    "id": sent.get("id").cloned().unwrap_or(Value::Null),
                    "threadId": sent.get("threadId").cloned().unwrap_or(Value::Null),
                }))
            }
            ToolCall::ListEmails(query) => {
                let emails = self
                    .api
                    .list_emails(credential, &query)
                    .await?
                    .iter()
                    .map(EmailSummary::from_google)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({ "count": emails.len(), "emails": to_json(&emails)? }))
            }
            ToolCall::GetEmail { id } => {
                let message = self.api.get_email(credential, &id).await?;
                to_json(&EmailDetail::from_google(&message)?)
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
}
