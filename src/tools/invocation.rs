use serde::{Deserialize, Serialize};

/// Inbound request to run one catalog tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}
