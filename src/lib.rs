//! # testrail-mcp
//!
//! Model Context Protocol server for TestRail.
//!
//! Each TestRail REST operation (projects, cases, runs, results, datasets)
//! is exposed as an MCP tool with a typed parameter contract, and the
//! read-only lookups are also addressable as `testrail://` resources. An
//! agent talks JSON-RPC over stdio; the server turns each call into exactly
//! one authenticated HTTP request and hands back TestRail's JSON unchanged.
//!
//! ## Quick Start
//!
//! ```bash
//! export TESTRAIL_URL=https://example.testrail.io
//! export TESTRAIL_USERNAME=qa@example.com
//! export TESTRAIL_API_KEY=...
//!
//! # Run the stdio server
//! testrail-mcp
//!
//! # Or call a single tool
//! testrail-mcp call get_case --args '{"case_id": 42}'
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]
#![allow(clippy::use_self)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod core;
pub mod integrations;
pub mod mcp;

// Re-export commonly used types
pub use crate::core::{Config, ConfigError};
pub use integrations::{ApiDispatch, HttpMethod, TestRailClient, TestRailError};
pub use mcp::{MCPServer, OperationDescriptor, ToolCall, ToolError, ToolRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
