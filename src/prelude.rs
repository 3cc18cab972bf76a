//! Convenience re-exports for common use.

pub use crate::auth::{AuthError, Credential, CredentialStore, TokenGuard};
pub use crate::config::BridgeConfig;
pub use crate::dispatch::{CallDispatcher, OutboundCallResult};
pub use crate::error::{BridgeError, ErrorKind, Result, ToolError};
pub use crate::mcp::McpServer;
pub use crate::tools::{ToolCatalog, ToolInvocation};
