use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::tools::{HttpMethod, ParamLocation, ToolSpec, API_PREFIX};

/// A tool invocation bound to a concrete catalog request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: reqwest::Url,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl PreparedRequest {
    /// Bind validated arguments onto the tool's request template.
    ///
    /// Path arguments are percent-encoded as single segments, so an id can
    /// never escape its position in the path.
    pub fn build(
        api_base: &reqwest::Url,
        tool: &ToolSpec,
        args: &Map<String, Value>,
    ) -> Result<Self, BridgeError> {
        let arg = |name: &str| args.get(name).filter(|value| !value.is_null());

        let mut url = api_base.clone();
        url.set_query(None);
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                BridgeError::Configuration(format!("api base {api_base} cannot carry a path"))
            })?;
            segments.pop_if_empty();
            segments.extend(API_PREFIX.trim_start_matches('/').split('/'));
            for part in tool.path.trim_start_matches('/').split('/') {
                match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    Some(name) => {
                        let value = arg(name).ok_or_else(|| {
                            BridgeError::invalid_arguments(
                                tool.name,
                                format!("missing required field '{name}'"),
                            )
                        })?;
                        let segment = scalar_to_string(value);
                        if matches!(segment.trim(), "" | "." | "..") {
                            return Err(BridgeError::invalid_arguments(
                                tool.name,
                                format!("'{name}' must be a non-empty id, got {segment:?}"),
                            ));
                        }
                        segments.push(&segment);
                    }
                    None => {
                        segments.push(part);
                    }
                }
            }
        }

        let mut query = Vec::new();
        let mut body = None;
        for param in tool.params {
            match param.location {
                ParamLocation::Path => {}
                ParamLocation::Query => {
                    let value = arg(param.name)
                        .map(scalar_to_string)
                        .or_else(|| param.default.map(|default| default.to_string()));
                    if let Some(value) = value {
                        query.push((param.wire_name.to_string(), value));
                    }
                }
                ParamLocation::Body => {
                    body = arg(param.name).cloned();
                }
            }
        }

        Ok(Self {
            method: tool.method,
            url,
            query,
            body,
        })
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolCatalog;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(base: &str, tool: &str, args: Value) -> PreparedRequest {
        let base = reqwest::Url::parse(base).unwrap();
        let tool = ToolCatalog::standard().get(tool).unwrap();
        PreparedRequest::build(&base, tool, args.as_object().unwrap()).unwrap()
    }

    #[test]
    fn list_resources_applies_defaults_and_wire_names() {
        let request = build(
            "https://api.example.org:18899",
            "list_resources",
            json!({ "resource_type": "dataset", "tags": null }),
        );
        assert_eq!(
            request.url.as_str(),
            "https://api.example.org:18899/api/v1/rf/resources/public"
        );
        assert_eq!(
            request.query,
            vec![
                ("type".to_string(), "dataset".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("offset".to_string(), "0".to_string()),
            ]
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn path_arguments_are_percent_encoded() {
        let request = build(
            "http://localhost:8080/",
            "get_resource",
            json!({ "resource_id": "a/b c" }),
        );
        assert_eq!(
            request.url.as_str(),
            "http://localhost:8080/api/v1/rf/resources/public/a%2Fb%20c"
        );
    }

    #[test]
    fn blank_and_dot_path_ids_are_rejected() {
        let base = reqwest::Url::parse("http://localhost:8080").unwrap();
        let tool = ToolCatalog::standard().get("delete_project").unwrap();
        for id in ["", "   ", ".", "..", " .. "] {
            let args = json!({ "project_id": id });
            let err = PreparedRequest::build(&base, tool, args.as_object().unwrap()).unwrap_err();
            assert!(
                matches!(err, BridgeError::InvalidArguments { .. }),
                "{id:?}: {err:?}"
            );
        }
        let request = build("http://localhost:8080", "delete_project", json!({ "project_id": "..a" }));
        assert_eq!(request.url.as_str(), "http://localhost:8080/api/v1/rf/projects/..a");
    }

    #[test]
    fn trailing_slash_is_preserved() {
        let request = build("http://localhost:8080", "list_projects", json!({}));
        assert_eq!(request.url.as_str(), "http://localhost:8080/api/v1/rf/projects/");
        assert_eq!(request.method, HttpMethod::Get);
    }

    #[test]
    fn body_and_query_bindings() {
        let create = build(
            "http://localhost:8080",
            "create_project",
            json!({ "data": { "name": "demo" } }),
        );
        assert_eq!(create.body, Some(json!({ "name": "demo" })));

        let session = build(
            "http://localhost:8080",
            "start_project_session",
            json!({ "project_id": "p1", "session_name": "s1" }),
        );
        assert_eq!(
            session.url.as_str(),
            "http://localhost:8080/api/v1/rf/hub/start/project/p1"
        );
        assert_eq!(
            session.query,
            vec![("sessionName".to_string(), "s1".to_string())]
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let request = build("http://localhost:8080/gateway/", "get_all_tags", json!({}));
        assert_eq!(
            request.url.as_str(),
            "http://localhost:8080/gateway/api/v1/rf/resources/public/tags/all"
        );
    }
}
