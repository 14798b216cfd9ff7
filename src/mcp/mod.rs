//! MCP (Model Context Protocol) server.
//!
//! Exposes TestRail operations as MCP tools, and the read-only subset as
//! templated resources, over line-delimited JSON-RPC on stdio.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  MCPServer (stdio JSON-RPC loop)             │
//! │   initialize · tools/* · resources/*         │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//!   ToolRegistry  ◄──────────  resource templates
//!   (OPERATIONS table)         testrail://case/{case_id}
//!          │
//!          ▼
//!   ApiDispatch (TestRailClient)
//!          │  one HTTP round trip
//!          ▼
//!   <instance>/index.php?/api/v2/<endpoint>
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use testrail_mcp::{Config, MCPServer, TestRailClient, ToolRegistry};
//!
//! let config = Config::from_env()?;
//! let client = TestRailClient::new(&config)?;
//! let server = Arc::new(MCPServer::new(ToolRegistry::new(Arc::new(client))));
//! server.serve_stdio().await?;
//! ```

mod operations;
mod protocol;
mod resources;
mod server;
mod tools;

pub use operations::OPERATIONS;
pub use protocol::{
    CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, MCPInitializeParams,
    MCPInitializeResult, MCPResourceTemplate, MCPServerCapabilities, MCPServerInfo, MCPTool,
    MCPToolInputSchema, ReadResourceParams, ReadResourceResult, RequestId, ResourceContents,
    ToolContent, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, MCP_PROTOCOL_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
pub use resources::{
    list_templates, read as read_resource, resolve as resolve_resource, ResolvedResource,
    ResourceError, ResourceTemplate, RESOURCE_TEMPLATES,
};
pub use server::{MCPServer, MCPServerError, SERVER_NAME};
pub use tools::{
    format_tool, OperationDescriptor, ParamKind, ParamLocation, ParamSpec, PreparedRequest,
    ToolCall, ToolError, ToolRegistry,
};
