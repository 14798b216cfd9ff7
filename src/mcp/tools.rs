//! MCP Tool registry.
//!
//! Every remote operation is an [`OperationDescriptor`]: a name, an HTTP
//! method, a URI template, and typed parameter specs. One generic path
//! validates arguments, applies the omission rule, builds the relative
//! path and payload, and hands the request to the dispatcher.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::operations::OPERATIONS;
use super::protocol::{MCPTool, MCPToolInputSchema};
use crate::integrations::{ApiDispatch, HttpMethod, TestRailError};

/// JSON type accepted for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Integer,
    String,
    Boolean,
    /// Array of integers, e.g. `case_ids`
    IntegerList,
    /// Array of objects, e.g. bulk `results`
    ObjectList,
}

impl ParamKind {
    /// Whether a JSON value has this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::String => value.is_string(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::IntegerList => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| v.is_i64() || v.is_u64())),
            ParamKind::ObjectList => {
                value.as_array().is_some_and(|items| items.iter().all(Value::is_object))
            }
        }
    }

    /// Human-readable name used in validation errors.
    pub fn type_name(self) -> &'static str {
        match self {
            ParamKind::Integer => "an integer",
            ParamKind::String => "a string",
            ParamKind::Boolean => "a boolean",
            ParamKind::IntegerList => "an array of integers",
            ParamKind::ObjectList => "an array of objects",
        }
    }

    fn json_schema(self) -> Value {
        match self {
            ParamKind::Integer => serde_json::json!({ "type": "integer" }),
            ParamKind::String => serde_json::json!({ "type": "string" }),
            ParamKind::Boolean => serde_json::json!({ "type": "boolean" }),
            ParamKind::IntegerList => {
                serde_json::json!({ "type": "array", "items": { "type": "integer" } })
            }
            ParamKind::ObjectList => {
                serde_json::json!({ "type": "array", "items": { "type": "object" } })
            }
        }
    }
}

/// Where a parameter ends up in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    /// Interpolated into the URI template
    Path,
    /// Appended as `&name=value`
    Query,
    /// Field of the JSON payload
    Body,
}

/// Declaration of one tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub location: ParamLocation,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    /// Required integer identifier interpolated into the path.
    pub const fn id(name: &'static str, description: &'static str) -> Self {
        Self { name, kind: ParamKind::Integer, location: ParamLocation::Path, required: true, description }
    }

    /// Required payload field.
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name, kind, location: ParamLocation::Body, required: true, description }
    }

    /// Optional payload field, omitted when absent.
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name, kind, location: ParamLocation::Body, required: false, description }
    }

    /// Optional query filter, omitted when absent.
    pub const fn filter(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name, kind, location: ParamLocation::Query, required: false, description }
    }
}

/// Static declaration of one remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    /// Tool name, also the TestRail endpoint name
    pub name: &'static str,
    pub description: &'static str,
    pub method: HttpMethod,
    /// Relative URI with `{param}` placeholders
    pub endpoint: &'static str,
    pub params: &'static [ParamSpec],
}

/// Request derived from a descriptor and a set of arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    /// Relative path with identifiers and filters filled in
    pub path: String,
    /// `None` for operations that take no payload fields
    pub payload: Option<Map<String, Value>>,
}

/// Error type for tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Api(#[from] TestRailError),
}

/// Argument lookup with the omission rule: `null` counts as absent.
fn present<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

fn render_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl OperationDescriptor {
    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Required parameters in declaration order.
    pub fn required_params(&self) -> impl Iterator<Item = &'static ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    /// Whether the operation sends a JSON payload at all.
    pub fn has_payload(&self) -> bool {
        self.params.iter().any(|p| p.location == ParamLocation::Body)
    }

    fn invalid(&self, message: String) -> ToolError {
        ToolError::InvalidArguments { tool: self.name.to_string(), message }
    }

    /// Check required presence and the kind of every supplied parameter.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), ToolError> {
        for spec in self.params {
            match present(args, spec.name) {
                None if spec.required => {
                    return Err(self.invalid(format!("missing required parameter '{}'", spec.name)));
                }
                Some(value) if !spec.kind.accepts(value) => {
                    return Err(self.invalid(format!(
                        "parameter '{}' must be {}",
                        spec.name,
                        spec.kind.type_name()
                    )));
                }
                _ => {}
            }
        }

        for key in args.keys() {
            if self.param(key).is_none() {
                tracing::debug!(tool = self.name, argument = %key, "Ignoring unknown argument");
            }
        }

        Ok(())
    }

    /// Validate arguments and build the request for this operation.
    pub fn prepare(&self, args: &Map<String, Value>) -> Result<PreparedRequest, ToolError> {
        self.validate(args)?;

        let mut path = self.endpoint.to_string();
        let mut payload = self.has_payload().then(Map::new);

        for spec in self.params {
            let Some(value) = present(args, spec.name) else {
                continue;
            };
            match spec.location {
                ParamLocation::Path => {
                    path = path.replace(&format!("{{{}}}", spec.name), &render_segment(value));
                }
                ParamLocation::Query => {
                    path.push_str(&format!("&{}={}", spec.name, render_segment(value)));
                }
                ParamLocation::Body => {
                    if let Some(payload) = payload.as_mut() {
                        payload.insert(spec.name.to_string(), value.clone());
                    }
                }
            }
        }

        Ok(PreparedRequest { method: self.method, path, payload })
    }

    /// MCP tool definition with a JSON Schema generated from the params.
    pub fn to_mcp_tool(&self) -> MCPTool {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|spec| {
                let mut schema = spec.kind.json_schema();
                schema["description"] = Value::String(spec.description.to_string());
                (spec.name.to_string(), schema)
            })
            .collect();

        let required: Vec<String> = self.required_params().map(|p| p.name.to_string()).collect();

        MCPTool {
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            input_schema: MCPToolInputSchema {
                schema_type: "object".to_string(),
                properties: Some(properties),
                required: Some(required),
            },
        }
    }
}

/// Represents a tool call request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name
    pub name: String,
    /// Tool arguments
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), arguments: Map::new() }
    }

    /// Add an argument.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Registry of TestRail operations bound to a dispatcher.
#[derive(Clone)]
pub struct ToolRegistry {
    dispatcher: Arc<dyn ApiDispatch>,
    operations: &'static [OperationDescriptor],
}

impl ToolRegistry {
    /// Create a registry over the built-in operation table.
    pub fn new(dispatcher: Arc<dyn ApiDispatch>) -> Self {
        Self { dispatcher, operations: OPERATIONS }
    }

    /// Get a descriptor by tool name.
    pub fn get(&self, name: &str) -> Option<&'static OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// All descriptors in registration order.
    pub fn all(&self) -> impl Iterator<Item = &'static OperationDescriptor> {
        self.operations.iter()
    }

    /// Get count of tools.
    pub fn count(&self) -> usize {
        self.operations.len()
    }

    /// Tool definitions for `tools/list`.
    pub fn list_tools(&self) -> Vec<MCPTool> {
        self.all().map(OperationDescriptor::to_mcp_tool).collect()
    }

    /// Invoke a tool by name.
    pub async fn call(&self, name: &str, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let operation = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        self.invoke(operation, args).await
    }

    /// Invoke a [`ToolCall`].
    pub async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        self.call(&call.name, &call.arguments).await
    }

    /// Invoke a resolved descriptor.
    pub async fn invoke(
        &self,
        operation: &OperationDescriptor,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let request = operation.prepare(args)?;
        tracing::info!(tool = operation.name, method = %request.method, path = %request.path, "Calling tool");

        let response =
            self.dispatcher.send_request(request.method, &request.path, request.payload.as_ref()).await?;
        Ok(response)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.operations.len()).finish()
    }
}

/// Format a tool for display.
pub fn format_tool(operation: &OperationDescriptor) -> String {
    let mut output = format!("{} ({} {})", operation.name, operation.method, operation.endpoint);
    output.push_str(&format!("\n  {}", operation.description));

    if !operation.params.is_empty() {
        output.push_str("\n  Parameters:");
        for spec in operation.params {
            let marker = if spec.required { "*" } else { " " };
            output.push_str(&format!(
                "\n   {} {} ({:?}, {:?}): {}",
                marker, spec.name, spec.kind, spec.location, spec.description
            ));
        }
    }

    output
}
