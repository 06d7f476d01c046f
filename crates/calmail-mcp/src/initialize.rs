use tracing::info;

use crate::config::Integration;
use crate::protocol::{
    Implementation, InitializeRequest, InitializeResponse, ServerCapabilities, MCP_PROTOCOL_VERSION,
};

pub fn handle_initialize(
    request: InitializeRequest,
    integration: Integration,
) -> InitializeResponse {
    info!(
        client = %request.client_info.name,
        client_version = %request.client_info.version,
        requested_protocol = %request.protocol_version,
        "initialize"
    );

    // Accept any client protocol version; the client adapts to ours
    InitializeResponse {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities::default(),
        server_info: Implementation {
            name: "calmail-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        instructions: instructions(integration).to_string(),
    }
}

fn instructions(integration: Integration) -> &'static str {
    match integration {
        Integration::Calendar => {
            "calmail manages events on the user's primary Google Calendar. \
             Give times with an IANA timezone, and confirm with the user before deleting events. \
             The first call may wait for the user to approve access in a browser."
        }
        Integration::Email => {
            "calmail sends and reads the user's Gmail. \
             Confirm recipients and content with the user before sending. \
             The first call may wait for the user to approve access in a browser."
        }
    }
}
