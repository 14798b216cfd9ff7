//! MCP server over stdio.
//!
//! Reads one JSON-RPC message per line, answers each request on its own
//! task, and funnels responses through a single writer so lines never
//! interleave. The server holds the tool registry; it does not own any
//! TestRail state itself.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::protocol::{
    CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, MCPInitializeParams,
    MCPInitializeResult, MCPServerCapabilities, MCPServerInfo, ReadResourceParams,
    RequestId, MCP_PROTOCOL_VERSION,
};
use super::resources::{self, ResourceError};
use super::tools::{ToolError, ToolRegistry};

/// Name reported in the `initialize` handshake.
pub const SERVER_NAME: &str = "TestRail MCP Server";

/// Error type for MCP server operations.
#[derive(Debug, thiserror::Error)]
pub enum MCPServerError {
    #[error("Communication error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Writer task failed: {0}")]
    Task(String),
}

/// MCP server instance.
#[derive(Debug)]
pub struct MCPServer {
    /// Tools and the dispatcher behind them
    registry: ToolRegistry,
    /// Reported in the handshake
    info: MCPServerInfo,
}

impl MCPServer {
    /// Create a new MCP server over a registry.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: MCPServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(crate::VERSION.to_string()),
            },
        }
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse message");
                return Some(JsonRpcResponse::failure(None, JsonRpcError::parse_error(e.to_string())));
            }
        };

        // Keep the id when the message is JSON but not a valid request.
        let id: Option<RequestId> = message.get("id").cloned().and_then(|id| serde_json::from_value(id).ok());
        match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request");
                Some(JsonRpcResponse::failure(id, JsonRpcError::invalid_request(e.to_string())))
            }
        }
    }

    /// Handle a parsed request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }

        let id = request.id.clone();
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_request(format!("Unsupported jsonrpc version: {}", request.jsonrpc)),
            ));
        }

        tracing::debug!(method = %request.method, "Request received");

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(Value::Object(serde_json::Map::new())),
            "tools/list" => to_result(&ListToolsResult { tools: self.registry.list_tools() }),
            "tools/call" => self.call_tool(request.params).await,
            "resources/list" => to_result(&ListResourcesResult::default()),
            "resources/templates/list" => to_result(&ListResourceTemplatesResult {
                resource_templates: resources::list_templates(),
            }),
            "resources/read" => self.read_resource(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: MCPInitializeParams =
            params.and_then(|p| serde_json::from_value(p).ok()).unwrap_or_default();

        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                requested = params.protocol_version.as_deref().unwrap_or("unspecified"),
                "Client connected"
            );
        }

        to_result(&MCPInitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: MCPServerCapabilities {
                tools: Some(serde_json::json!({})),
                resources: Some(serde_json::json!({})),
            },
            server_info: self.info.clone(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params)?;
        let arguments = params.arguments.unwrap_or_default();

        let result = match self.registry.call(&params.name, &arguments).await {
            Ok(value) => CallToolResult::text(pretty(&value)),
            Err(ToolError::Api(e)) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool call failed");
                CallToolResult::error(e.to_string())
            }
            Err(e) => return Err(JsonRpcError::invalid_params(e.to_string())),
        };

        to_result(&result)
    }

    async fn read_resource(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = parse_params(params)?;

        match resources::read(&self.registry, &params.uri).await {
            Ok(result) => to_result(&result),
            Err(e @ (ResourceError::InvalidUri { .. } | ResourceError::UnknownResource(_))) => {
                Err(JsonRpcError::invalid_params(e.to_string()))
            }
            Err(ResourceError::Tool(ToolError::Api(e))) => {
                tracing::warn!(uri = %params.uri, error = %e, "Resource read failed");
                Err(JsonRpcError::internal(e.to_string()))
            }
            Err(e) => Err(JsonRpcError::invalid_params(e.to_string())),
        }
    }

    /// Serve line-delimited JSON-RPC until the reader reaches EOF.
    ///
    /// Requests in flight at EOF still complete and are written before
    /// this returns. Reading stops early if the writer fails, so no new
    /// calls reach TestRail once responses can no longer be delivered.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, writer: W) -> Result<(), MCPServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let json = serde_json::to_string(&response)?;
                tracing::trace!(response = %json, "Sending response");
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), MCPServerError>(())
        });

        let mut buf = Vec::new();
        let read_result = loop {
            buf.clear();
            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => read,
                () = tx.closed() => {
                    tracing::error!("Output closed, no longer reading requests");
                    break Ok(());
                }
            };
            match read {
                Ok(0) => {
                    tracing::info!("Input closed, draining pending responses");
                    break Ok(());
                }
                Ok(_) => {}
                Err(e) => break Err(MCPServerError::Io(e)),
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim().to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "Received a line that is not valid UTF-8");
                    let error = JsonRpcError::parse_error(format!("Invalid UTF-8: {}", e));
                    let _ = tx.send(JsonRpcResponse::failure(None, error));
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            tracing::trace!(request = %line, "Received message");

            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_message(&line).await {
                    if tx.send(response).is_err() {
                        tracing::error!("Response dropped: output closed");
                    }
                }
            });
        };

        drop(tx);

        // A writer failure is the root cause when both sides failed.
        writer_task.await.map_err(|e| MCPServerError::Task(e.to_string()))??;
        read_result
    }

    /// Serve on the process's stdin/stdout.
    pub async fn serve_stdio(self: Arc<Self>) -> Result<(), MCPServerError> {
        tracing::info!(tools = self.registry.count(), "Starting TestRail MCP server in stdio mode");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::INVALID_PARAMS;

    #[test]
    fn test_parse_params_missing() {
        let err = parse_params::<ReadResourceParams>(None).unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
    }

    #[test]
    fn test_parse_params_wrong_shape() {
        let err = parse_params::<ReadResourceParams>(Some(serde_json::json!({"url": "x"})))
            .unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(err.message.contains("uri"));
    }

    #[test]
    fn test_pretty_output() {
        let text = pretty(&serde_json::json!({"id": 1}));
        assert_eq!(text, "{\n  \"id\": 1\n}");
    }
}
