//! Catalog tool table, argument schemas and validation.

pub mod catalog;
pub mod invocation;
pub mod types;
pub mod validation;

pub use catalog::{
    HttpMethod, ParamKind, ParamLocation, ParamSpec, ToolCatalog, ToolSpec, API_PREFIX,
};
pub use invocation::ToolInvocation;
pub use types::{ParameterBuilder, ToolParameters};
pub use validation::{normalize_arguments, validate_arguments};
