//! Error types for the bridge.

pub mod unified;

pub use unified::{ErrorKind, ToolError};

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for all bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("Remote catalog unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote catalog rejected the request (status {status}): {body}")]
    RemoteRejected {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error for the agent-facing boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::AuthenticationRequired(_) => ErrorKind::AuthenticationRequired,
            Self::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            Self::RemoteRejected { .. } => ErrorKind::RemoteRejected,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Storage(_) | Self::Serialization(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Only transient network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }

    /// Render as the structured object returned to the agent.
    pub fn to_tool_error(&self) -> ToolError {
        let mut error = ToolError::new(self.kind(), self.to_string());
        if let Self::RemoteRejected { status, body } = self {
            error.status = Some(*status);
            error.body = Some(body.clone());
        }
        error
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(error: reqwest::Error) -> Self {
        Self::RemoteUnavailable(error.to_string())
    }
}

impl From<AuthError> for BridgeError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Storage(message) => Self::Storage(message),
            AuthError::Configuration(message) => Self::Configuration(message),
            AuthError::AuthenticationRequired(cause) => {
                Self::AuthenticationRequired(cause.to_string())
            }
            other => Self::AuthenticationRequired(other.to_string()),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
