pub mod framing;
pub mod jsonrpc;

pub use framing::{decode_request, FramingError, LineTransport};
pub use jsonrpc::{codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
