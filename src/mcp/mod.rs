//! Model Context Protocol (MCP) server.
//!
//! Tools are handed to [`McpServer`] when it is built; the server answers JSON-RPC 2.0
//! requests and does not change after construction. Two transports carry the messages:
//!
//! - stdio: one JSON message per line on stdin, responses on stdout
//! - http: JSON messages POSTed to `/mcp`
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{HttpTransport, StdioTransport};
