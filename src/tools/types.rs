//! Parameter schemas for catalog tools.

use serde::{Deserialize, Serialize};

/// JSON Schema describing a tool's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    pub schema: serde_json::Value,
}

impl ToolParameters {
    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for constructing tool parameter schemas.
pub struct ParameterBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(
        mut self,
        name: impl Into<String>,
        mut schema: serde_json::Value,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        schema["description"] = serde_json::Value::String(description.into());
        self.properties.insert(name.clone(), schema);
        if required {
            self.required.push(name);
        }
        self
    }

    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, serde_json::json!({ "type": "string" }), description, required)
    }

    pub fn integer(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: Option<i64>,
        required: bool,
    ) -> Self {
        let mut schema = serde_json::json!({ "type": "integer" });
        if let Some(default) = default {
            schema["default"] = default.into();
        }
        self.property(name, schema, description, required)
    }

    pub fn object(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, serde_json::json!({ "type": "object" }), description, required)
    }

    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
