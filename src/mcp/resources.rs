//! Resource templates.
//!
//! Read-only operations addressable as `testrail://category/{id}`. Reading
//! a resource resolves its address to a descriptor plus one integer
//! argument and goes through the same invoke path as a tool call.

use serde_json::{Map, Value};

use super::protocol::{MCPResourceTemplate, ReadResourceResult, ResourceContents};
use super::tools::{ToolError, ToolRegistry};

/// URI scheme for every resource this server exposes.
pub const SCHEME: &str = "testrail://";

/// MIME type of resource contents.
pub const MIME_JSON: &str = "application/json";

/// A templated resource backed by a read-only tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTemplate {
    /// Path segment after the scheme, e.g. `case`
    pub category: &'static str,
    /// Name of the identifier placeholder, forwarded as the tool argument
    pub param: &'static str,
    /// Tool the resource reads through
    pub tool: &'static str,
    pub description: &'static str,
}

impl ResourceTemplate {
    /// Template string, e.g. `testrail://case/{case_id}`.
    pub fn uri_template(&self) -> String {
        format!("{}{}/{{{}}}", SCHEME, self.category, self.param)
    }

    pub fn to_mcp_template(&self) -> MCPResourceTemplate {
        MCPResourceTemplate {
            uri_template: self.uri_template(),
            name: self.category.to_string(),
            description: Some(self.description.to_string()),
            mime_type: Some(MIME_JSON.to_string()),
        }
    }
}

/// Every resource template, in registration order.
pub static RESOURCE_TEMPLATES: &[ResourceTemplate] = &[
    ResourceTemplate {
        category: "project",
        param: "project_id",
        tool: "get_project",
        description: "Get a project by ID",
    },
    ResourceTemplate {
        category: "case",
        param: "case_id",
        tool: "get_case",
        description: "Get a test case by ID",
    },
    ResourceTemplate {
        category: "run",
        param: "run_id",
        tool: "get_run",
        description: "Get a test run by ID",
    },
    ResourceTemplate {
        category: "results",
        param: "test_id",
        tool: "get_results",
        description: "Get all test results for a test",
    },
    ResourceTemplate {
        category: "dataset",
        param: "dataset_id",
        tool: "get_dataset",
        description: "Get a dataset by ID",
    },
];

/// Error type for resource reads.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Invalid resource URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// A resource address resolved to its tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    pub template: &'static ResourceTemplate,
    /// Single-entry argument map for the backing tool
    pub arguments: Map<String, Value>,
}

/// Resolve a `testrail://category/{id}` address.
pub fn resolve(uri: &str) -> Result<ResolvedResource, ResourceError> {
    let invalid = |reason: &str| ResourceError::InvalidUri { uri: uri.to_string(), reason: reason.to_string() };

    let rest = uri.strip_prefix(SCHEME).ok_or_else(|| invalid("expected testrail:// scheme"))?;
    let (category, id) = rest.split_once('/').ok_or_else(|| invalid("missing identifier"))?;

    let template = RESOURCE_TEMPLATES
        .iter()
        .find(|t| t.category == category)
        .ok_or_else(|| ResourceError::UnknownResource(uri.to_string()))?;

    let id: i64 = id.parse().map_err(|_| invalid("identifier must be an integer"))?;

    let mut arguments = Map::new();
    arguments.insert(template.param.to_string(), Value::from(id));
    Ok(ResolvedResource { template, arguments })
}

/// Templates for `resources/templates/list`.
pub fn list_templates() -> Vec<MCPResourceTemplate> {
    RESOURCE_TEMPLATES.iter().map(ResourceTemplate::to_mcp_template).collect()
}

/// Read a resource: resolve the address, call the backing tool, and wrap
/// the JSON response as text contents.
pub async fn read(registry: &ToolRegistry, uri: &str) -> Result<ReadResourceResult, ResourceError> {
    let resolved = resolve(uri)?;
    let value = registry.call(resolved.template.tool, &resolved.arguments).await?;

    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    Ok(ReadResourceResult {
        contents: vec![ResourceContents {
            uri: uri.to_string(),
            mime_type: Some(MIME_JSON.to_string()),
            text,
        }],
    })
}
