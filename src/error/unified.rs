//! Structured error objects handed to the agent-facing boundary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    InvalidArguments,
    UnknownTool,
    AuthenticationRequired,
    AuthorizationDenied,
    AuthorizationExpired,
    RemoteUnavailable,
    RemoteRejected,
    Configuration,
    Internal,
}

/// Error object returned in place of a payload.
///
/// Carries the kind, a human-readable message and, for catalog rejections,
/// the upstream status and body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub error_kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ToolError {
    pub fn new(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error_kind,
            message: message.into(),
            status: None,
            body: None,
        }
    }
}
