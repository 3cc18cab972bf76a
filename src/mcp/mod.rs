//! Model Context Protocol (MCP) server over stdio.

pub mod protocol;
pub mod server;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, ToolDefinition};
pub use server::McpServer;
