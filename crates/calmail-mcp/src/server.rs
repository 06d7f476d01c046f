//! MCP stdio server loop.
//!
//! Requests are handled strictly one at a time in arrival order. A tool call
//! that is waiting on user consent holds the loop until consent completes.

use calmail_protocol::{
    codes, decode_request, FramingError, JsonRpcRequest, JsonRpcResponse, LineTransport,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::auth::CredentialSource;
use crate::common::ToolError;
use crate::google::WorkspaceApi;
use crate::initialize::handle_initialize;
use crate::protocol::{InitializeRequest, ToolsCallRequest, ToolsCallResponse};
use crate::tools::Dispatcher;

pub struct McpServer<C, A> {
    dispatcher: Dispatcher<C, A>,
}

impl<C, A> McpServer<C, A>
where
    C: CredentialSource,
    A: WorkspaceApi,
{
    pub fn new(dispatcher: Dispatcher<C, A>) -> Self {
        Self { dispatcher }
    }

    /// Serve until the input closes.
    pub async fn serve<R, W>(
        &mut self,
        transport: &mut LineTransport<R, W>,
    ) -> Result<(), FramingError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(integration = %self.dispatcher.registry().integration(), "MCP server ready");

        loop {
            let response = match transport.next_line().await {
                Ok(Some(line)) => self.handle_line(&line).await,
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "unreadable input line");
                    Some(parse_error(&e))
                }
                Err(e) => return Err(e),
            };
            if let Some(response) = response {
                transport.write_response(&response).await?;
            }
        }

        info!("input closed, shutting down");
        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        match decode_request(line) {
            Ok(request) => self.handle(request).await,
            Err(FramingError::InvalidRequest(message)) => {
                let id = serde_json::from_str::<Value>(line)
                    .ok()
                    .and_then(|v| v.get("id").cloned())
                    .unwrap_or(Value::Null);
                Some(JsonRpcResponse::error(id, codes::INVALID_REQUEST, message, None))
            }
            Err(e) => Some(parse_error(&e)),
        }
    }

    /// Handle one request. Notifications get `None`.
    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "notification");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => match serde_json::from_value::<InitializeRequest>(request.params) {
                Ok(init) => {
                    let integration = self.dispatcher.registry().integration();
                    respond(id, &handle_initialize(init, integration))
                }
                Err(e) => {
                    JsonRpcResponse::invalid_params(id, format!("invalid initialize params: {}", e))
                }
            },
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => respond(id, &self.dispatcher.registry().list_response()),
            "tools/call" => match serde_json::from_value::<ToolsCallRequest>(request.params) {
                Ok(call) => self.call_tool(id, call).await,
                Err(e) => {
                    JsonRpcResponse::invalid_params(id, format!("invalid tools/call params: {}", e))
                }
            },
            other => JsonRpcResponse::method_not_found(id, other),
        };

        Some(response)
    }

    async fn call_tool(&mut self, id: Value, call: ToolsCallRequest) -> JsonRpcResponse {
        match self.dispatcher.invoke(&call.name, &call.arguments).await {
            Ok(result) => respond(id, &ToolsCallResponse::ok(&result)),
            Err(ToolError::UnknownTool(name)) => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("unknown tool: {}", name),
                None,
            ),
            Err(e) => {
                warn!(tool = %call.name, kind = e.kind(), error = %e, "tool call failed");
                respond(id, &ToolsCallResponse::failed(&e.to_payload()))
            }
        }
    }
}

fn parse_error(error: &FramingError) -> JsonRpcResponse {
    JsonRpcResponse::error(Value::Null, codes::PARSE_ERROR, format!("parse error: {}", error), None)
}

fn respond<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            codes::INTERNAL_ERROR,
            format!("failed to encode result: {}", e),
            None,
        ),
    }
}
