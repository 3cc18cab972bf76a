//! Static table of catalog tools and how their arguments map onto HTTP.

use strum::Display;

use super::types::ToolParameters;

/// Path prefix for every catalog endpoint.
pub const API_PREFIX: &str = "/api/v1/rf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Object,
}

/// Where an argument is placed on the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    /// Substituted for `{name}` in the path template.
    Path,
    Query,
    /// The argument value becomes the JSON request body.
    Body,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    /// Name used on the wire when it differs from the tool argument name.
    pub wire_name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub location: ParamLocation,
    pub required: bool,
    pub default: Option<i64>,
}

impl ParamSpec {
    const fn new(
        name: &'static str,
        kind: ParamKind,
        location: ParamLocation,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            wire_name: name,
            description,
            kind,
            location,
            required: true,
            default: None,
        }
    }

    const fn path(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, ParamLocation::Path, description)
    }

    const fn query(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, ParamLocation::Query, description)
    }

    const fn body(description: &'static str) -> Self {
        Self::new("data", ParamKind::Object, ParamLocation::Body, description)
    }

    const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    const fn wire(mut self, wire_name: &'static str) -> Self {
        self.wire_name = wire_name;
        self
    }

    const fn integer(mut self, default: i64) -> Self {
        self.kind = ParamKind::Integer;
        self.required = false;
        self.default = Some(default);
        self
    }
}

/// One catalog tool: name, description and request template.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub method: HttpMethod,
    /// Path under [`API_PREFIX`], with `{param}` placeholders.
    pub path: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolSpec {
    pub fn input_schema(&self) -> serde_json::Value {
        let builder = self
            .params
            .iter()
            .fold(ToolParameters::object(), |builder, param| match param.kind {
                ParamKind::String => builder.string(param.name, param.description, param.required),
                ParamKind::Integer => builder.integer(
                    param.name,
                    param.description,
                    param.default,
                    param.required,
                ),
                ParamKind::Object => builder.object(param.name, param.description, param.required),
            });
        builder.build().schema
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }
}

/// The fixed set of tools the bridge exposes.
#[derive(Debug, Clone, Copy)]
pub struct ToolCatalog {
    tools: &'static [ToolSpec],
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ToolCatalog {
    pub fn standard() -> Self {
        Self { tools: TOOLS }
    }

    pub fn get(&self, name: &str) -> Option<&'static ToolSpec> {
        self.iter().find(|tool| tool.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ToolSpec> {
        let tools: &'static [ToolSpec] = self.tools;
        tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

use HttpMethod::{Delete, Get, Patch, Post};

static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_resources",
        description: "List resources (datasets, notebooks, repositories, models) in the Cybershuttle catalog, with optional filters",
        method: Get,
        path: "/resources/public",
        params: &[
            ParamSpec::query("resource_type", "Filter by resource type (dataset, notebook, repository, model)")
                .wire("type")
                .optional(),
            ParamSpec::query("tags", "Filter by tags").optional(),
            ParamSpec::query("name", "Filter by name").optional(),
            ParamSpec::query("limit", "Number of results to return").integer(10),
            ParamSpec::query("offset", "Offset for pagination").integer(0),
        ],
    },
    ToolSpec {
        name: "get_resource",
        description: "Get detailed information about a resource by id",
        method: Get,
        path: "/resources/public/{resource_id}",
        params: &[ParamSpec::path("resource_id", "Id of the resource")],
    },
    ToolSpec {
        name: "search_resources",
        description: "Search resources by type and name",
        method: Get,
        path: "/resources/public/search",
        params: &[
            ParamSpec::query("resource_type", "Type of resource to search for").wire("type"),
            ParamSpec::query("name", "Name to search for"),
        ],
    },
    ToolSpec {
        name: "get_all_tags",
        description: "List every tag used in the catalog",
        method: Get,
        path: "/resources/public/tags/all",
        params: &[],
    },
    ToolSpec {
        name: "create_dataset",
        description: "Create a dataset resource in the catalog",
        method: Post,
        path: "/resources/dataset",
        params: &[ParamSpec::body("Dataset metadata and configuration")],
    },
    ToolSpec {
        name: "create_notebook",
        description: "Create a notebook resource in the catalog",
        method: Post,
        path: "/resources/notebook",
        params: &[ParamSpec::body("Notebook metadata and configuration")],
    },
    ToolSpec {
        name: "create_repository",
        description: "Create a repository resource from a GitHub URL",
        method: Post,
        path: "/resources/repository",
        params: &[ParamSpec::query("github_url", "GitHub repository URL").wire("githubUrl")],
    },
    ToolSpec {
        name: "create_model",
        description: "Create a model resource in the catalog",
        method: Post,
        path: "/resources/model",
        params: &[ParamSpec::body("Model metadata and configuration")],
    },
    ToolSpec {
        name: "list_projects",
        description: "List projects in the caller's workspace",
        method: Get,
        path: "/projects/",
        params: &[],
    },
    ToolSpec {
        name: "create_project",
        description: "Create a project that groups several resources",
        method: Post,
        path: "/projects/",
        params: &[ParamSpec::body("Project metadata and configuration")],
    },
    ToolSpec {
        name: "get_projects_by_owner",
        description: "List projects owned by a user",
        method: Get,
        path: "/projects/{owner_id}",
        params: &[ParamSpec::path("owner_id", "Id of the owning user")],
    },
    ToolSpec {
        name: "delete_project",
        description: "Delete a project",
        method: Delete,
        path: "/projects/{project_id}",
        params: &[ParamSpec::path("project_id", "Id of the project to delete")],
    },
    ToolSpec {
        name: "start_project_session",
        description: "Launch an interactive session for a project",
        method: Get,
        path: "/hub/start/project/{project_id}",
        params: &[
            ParamSpec::path("project_id", "Id of the project to start a session for"),
            ParamSpec::query("session_name", "Name for the session").wire("sessionName"),
        ],
    },
    ToolSpec {
        name: "resume_session",
        description: "Resume a stopped session",
        method: Get,
        path: "/hub/resume/session/{session_id}",
        params: &[ParamSpec::path("session_id", "Id of the session to resume")],
    },
    ToolSpec {
        name: "list_sessions",
        description: "List sessions, optionally filtered by status",
        method: Get,
        path: "/sessions/",
        params: &[ParamSpec::query("status", "Filter by session status").optional()],
    },
    ToolSpec {
        name: "update_session_status",
        description: "Change the status of a session",
        method: Patch,
        path: "/sessions/{session_id}",
        params: &[
            ParamSpec::path("session_id", "Id of the session"),
            ParamSpec::query("status", "New session status"),
        ],
    },
    ToolSpec {
        name: "delete_session",
        description: "Delete a session",
        method: Delete,
        path: "/sessions/{session_id}",
        params: &[ParamSpec::path("session_id", "Id of the session to delete")],
    },
];
