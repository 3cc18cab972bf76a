use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::ToolError;

/// Outcome of one tool invocation, as handed back to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundCallResult {
    Success { success: bool, payload: serde_json::Value },
    Failure(ToolError),
}

impl OutboundCallResult {
    pub fn success(payload: serde_json::Value) -> Self {
        Self::Success {
            success: true,
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(error) => Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Connectivity report for the catalog and the credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub api_base: String,
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn success_serializes_with_flag_and_payload() {
        let result = OutboundCallResult::success(json!(["a", "b"]));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "success": true, "payload": ["a", "b"] })
        );
    }

    #[test]
    fn failure_serializes_as_bare_error_object() {
        let result = OutboundCallResult::Failure(ToolError::new(ErrorKind::UnknownTool, "nope"));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "error_kind": "unknown_tool", "message": "nope" })
        );
        assert!(!result.is_success());
    }
}
