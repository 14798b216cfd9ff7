//! MCP Server Integration Tests
//!
//! Drives the JSON-RPC surface end-to-end against a recording dispatcher.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use testrail_mcp::integrations::{ApiErrorDetail, TestRailResult};
use testrail_mcp::mcp::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
use testrail_mcp::{ApiDispatch, HttpMethod, MCPServer, TestRailError, ToolCall, ToolRegistry};

type Recorded = (HttpMethod, String, Option<Map<String, Value>>);

/// Records every request and answers with a canned response.
struct RecordingDispatcher {
    calls: Mutex<Vec<Recorded>>,
    fail_with: Option<u16>,
}

impl RecordingDispatcher {
    fn ok() -> Arc<Self> {
        Arc::new(Self { calls: Mutex::new(Vec::new()), fail_with: None })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self { calls: Mutex::new(Vec::new()), fail_with: Some(status) })
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiDispatch for RecordingDispatcher {
    async fn send_request(
        &self,
        method: HttpMethod,
        uri: &str,
        data: Option<&Map<String, Value>>,
    ) -> TestRailResult<Value> {
        self.calls.lock().unwrap().push((method, uri.to_string(), data.cloned()));

        match self.fail_with {
            Some(status) => Err(TestRailError::RemoteApi {
                status,
                detail: ApiErrorDetail::Json(json!({"error": "Field :case_id is not a valid test case."})),
            }),
            None => Ok(json!({"id": 1, "uri": uri})),
        }
    }
}

fn server_with(dispatcher: Arc<RecordingDispatcher>) -> MCPServer {
    MCPServer::new(ToolRegistry::new(dispatcher))
}

async fn request(server: &MCPServer, message: Value) -> Value {
    let response = server.handle_message(&message.to_string()).await.expect("expected a response");
    serde_json::to_value(response).unwrap()
}

// ============================================================================
// Tool Invocation
// ============================================================================

#[tokio::test]
async fn test_add_case_posts_title() {
    let dispatcher = RecordingDispatcher::ok();
    let registry = ToolRegistry::new(dispatcher.clone());

    let call = ToolCall::new("add_case").arg("section_id", 5).arg("title", "Login works");
    registry.execute(&call).await.unwrap();

    let calls = dispatcher.calls();
    assert_eq!(calls.len(), 1);
    let (method, path, payload) = &calls[0];
    assert_eq!(*method, HttpMethod::Post);
    assert_eq!(path, "add_case/5");
    assert_eq!(payload.clone().map(Value::Object), Some(json!({"title": "Login works"})));
}

#[tokio::test]
async fn test_get_cases_without_suite() {
    let dispatcher = RecordingDispatcher::ok();
    let registry = ToolRegistry::new(dispatcher.clone());

    registry.execute(&ToolCall::new("get_cases").arg("project_id", 3)).await.unwrap();

    let calls = dispatcher.calls();
    assert_eq!(calls[0].0, HttpMethod::Get);
    assert_eq!(calls[0].1, "get_cases/3");
    assert!(calls[0].2.is_none());
}

#[tokio::test]
async fn test_update_run_forwards_false() {
    let dispatcher = RecordingDispatcher::ok();
    let registry = ToolRegistry::new(dispatcher.clone());

    let call = ToolCall::new("update_run").arg("run_id", 9).arg("include_all", false);
    registry.execute(&call).await.unwrap();

    let (method, path, payload) = &dispatcher.calls()[0];
    assert_eq!(*method, HttpMethod::Post);
    assert_eq!(path, "update_run/9");
    assert_eq!(payload.clone().map(Value::Object), Some(json!({"include_all": false})));
}

#[tokio::test]
async fn test_invalid_arguments_never_dispatch() {
    let dispatcher = RecordingDispatcher::ok();
    let registry = ToolRegistry::new(dispatcher.clone());

    assert!(registry.execute(&ToolCall::new("get_case")).await.is_err());
    assert!(registry.execute(&ToolCall::new("get_case").arg("case_id", "42")).await.is_err());
    assert!(registry.execute(&ToolCall::new("no_such_tool")).await.is_err());
    assert!(dispatcher.calls().is_empty());
}

// ============================================================================
// JSON-RPC Surface
// ============================================================================

#[tokio::test]
async fn test_initialize_handshake() {
    let server = server_with(RecordingDispatcher::ok());

    let response = request(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }
        }),
    )
    .await;

    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "TestRail MCP Server");
    assert_eq!(response["result"]["serverInfo"]["version"], testrail_mcp::VERSION);
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(response["result"]["capabilities"]["resources"].is_object());
}

#[tokio::test]
async fn test_ping_and_notifications() {
    let server = server_with(RecordingDispatcher::ok());

    let response = request(&server, json!({"jsonrpc": "2.0", "id": "a", "method": "ping"})).await;
    assert_eq!(response["id"], "a");
    assert_eq!(response["result"], json!({}));

    let notification = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    assert!(server.handle_message(&notification.to_string()).await.is_none());
}

#[tokio::test]
async fn test_protocol_errors() {
    let server = server_with(RecordingDispatcher::ok());

    let response = server.handle_message("{not json").await.unwrap();
    assert_eq!(response.error.unwrap().code, PARSE_ERROR);
    assert!(response.id.is_none());

    let response = request(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/unknown"})).await;
    assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);

    let response = request(&server, json!({"jsonrpc": "1.0", "id": 3, "method": "ping"})).await;
    assert_eq!(response["error"]["code"], INVALID_REQUEST);
    assert_eq!(response["id"], 3);

    let response = request(&server, json!({"id": 4, "params": {}})).await;
    assert_eq!(response["error"]["code"], INVALID_REQUEST);
    assert_eq!(response["id"], 4);
}

#[tokio::test]
async fn test_tools_list() {
    let server = server_with(RecordingDispatcher::ok());

    let response = request(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 26);

    let add_case = tools.iter().find(|t| t["name"] == "add_case").unwrap();
    assert_eq!(add_case["inputSchema"]["type"], "object");
    assert_eq!(add_case["inputSchema"]["required"], json!(["section_id", "title"]));
}

#[tokio::test]
async fn test_tools_call_success() {
    let dispatcher = RecordingDispatcher::ok();
    let server = server_with(dispatcher.clone());

    let response = request(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "get_case", "arguments": {"case_id": 42}}
        }),
    )
    .await;

    let content = &response["result"]["content"][0];
    assert_eq!(content["type"], "text");
    let body: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
    assert_eq!(body["uri"], "get_case/42");
    assert!(response["result"].get("isError").is_none());
    assert_eq!(dispatcher.calls()[0].1, "get_case/42");
}

#[tokio::test]
async fn test_tools_call_remote_error_is_tool_error() {
    let server = server_with(RecordingDispatcher::failing(400));

    let response = request(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "get_case", "arguments": {"case_id": 999}}
        }),
    )
    .await;

    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("400"));
    assert!(text.contains("not a valid test case"));
}

#[tokio::test]
async fn test_tools_call_bad_arguments() {
    let server = server_with(RecordingDispatcher::ok());

    let response = request(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "add_case", "arguments": {"section_id": 5}}
        }),
    )
    .await;

    assert_eq!(response["error"]["code"], INVALID_PARAMS);
    assert!(response["error"]["message"].as_str().unwrap().contains("title"));
}

// ============================================================================
// Resources
// ============================================================================

#[tokio::test]
async fn test_resource_templates_list() {
    let server = server_with(RecordingDispatcher::ok());

    let response =
        request(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "resources/templates/list"})).await;
    let templates = response["result"]["resourceTemplates"].as_array().unwrap();
    assert_eq!(templates.len(), 5);
    assert!(templates.iter().any(|t| t["uriTemplate"] == "testrail://case/{case_id}"));

    let response = request(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"})).await;
    assert_eq!(response["result"]["resources"], json!([]));
}

#[tokio::test]
async fn test_read_case_resource() {
    let dispatcher = RecordingDispatcher::ok();
    let server = server_with(dispatcher.clone());

    let response = request(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "resources/read",
            "params": {"uri": "testrail://case/42"}
        }),
    )
    .await;

    let contents = &response["result"]["contents"][0];
    assert_eq!(contents["uri"], "testrail://case/42");
    assert_eq!(contents["mimeType"], "application/json");

    let (method, path, payload) = &dispatcher.calls()[0];
    assert_eq!(*method, HttpMethod::Get);
    assert_eq!(path, "get_case/42");
    assert!(payload.is_none());
}

#[tokio::test]
async fn test_read_resource_errors() {
    let server = server_with(RecordingDispatcher::failing(403));

    let response = request(
        &server,
        json!({"jsonrpc": "2.0", "id": 9, "method": "resources/read", "params": {"uri": "testrail://case/abc"}}),
    )
    .await;
    assert_eq!(response["error"]["code"], INVALID_PARAMS);

    let response = request(
        &server,
        json!({"jsonrpc": "2.0", "id": 10, "method": "resources/read", "params": {"uri": "testrail://run/1"}}),
    )
    .await;
    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["message"].as_str().unwrap().contains("403"));
}

// ============================================================================
// Stdio Loop
// ============================================================================

#[tokio::test]
async fn test_serve_answers_each_request_line() {
    let server = Arc::new(server_with(RecordingDispatcher::ok()));

    let (mut client, server_io) = tokio::io::duplex(1024 * 1024);
    let (reader, writer) = tokio::io::split(server_io);

    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}).to_string(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        String::new(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}).to_string(),
    ]
    .join("\n")
        + "\n";

    client.write_all(input.as_bytes()).await.unwrap();
    client.shutdown().await.unwrap();

    server.serve(BufReader::new(reader), writer).await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();

    let mut ids: Vec<i64> = output
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_serve_keeps_going_after_invalid_utf8() {
    let dispatcher = RecordingDispatcher::ok();
    let server = Arc::new(server_with(dispatcher.clone()));

    let (mut client, server_io) = tokio::io::duplex(1024 * 1024);
    let (reader, writer) = tokio::io::split(server_io);

    let mut input = Vec::new();
    input.extend_from_slice(
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
               "params": {"name": "get_case", "arguments": {"case_id": 42}}})
        .to_string()
        .as_bytes(),
    );
    input.extend_from_slice(b"\n\xff\xfe\n");
    input.extend_from_slice(json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string().as_bytes());
    input.push(b'\n');

    client.write_all(&input).await.unwrap();
    client.shutdown().await.unwrap();

    server.serve(BufReader::new(reader), writer).await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    let responses: Vec<Value> = output.lines().map(|line| serde_json::from_str(line).unwrap()).collect();

    assert_eq!(responses.len(), 3);
    assert!(responses.iter().any(|r| r["id"] == 1 && r["result"].is_object()));
    assert!(responses.iter().any(|r| r["id"] == 2 && r["result"] == json!({})));
    let invalid = responses.iter().find(|r| r["id"].is_null()).unwrap();
    assert_eq!(invalid["error"]["code"], PARSE_ERROR);
    assert_eq!(dispatcher.calls().len(), 1);
}

/// Output sink that fails every write, like a closed stdout pipe.
struct BrokenPipe {
    attempted: Arc<AtomicBool>,
}

impl AsyncWrite for BrokenPipe {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
        self.attempted.store(true, Ordering::SeqCst);
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed")))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_serve_stops_dispatching_after_writer_failure() {
    let dispatcher = RecordingDispatcher::ok();
    let server = Arc::new(server_with(dispatcher.clone()));
    let attempted = Arc::new(AtomicBool::new(false));

    let (mut client, server_io) = tokio::io::duplex(1024 * 1024);
    let serving = tokio::spawn(
        server.serve(BufReader::new(server_io), BrokenPipe { attempted: attempted.clone() }),
    );

    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string() + "\n";
    client.write_all(ping.as_bytes()).await.unwrap();

    // Input stays open: serve must return on its own once the writer fails.
    let result = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve kept reading after the writer failed")
        .unwrap();
    assert!(attempted.load(Ordering::SeqCst));

    let delete = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                        "params": {"name": "delete_case", "arguments": {"case_id": 42}}})
    .to_string()
        + "\n";
    assert!(client.write_all(delete.as_bytes()).await.is_err());

    assert!(matches!(result, Err(testrail_mcp::mcp::MCPServerError::Io(_))));
    assert!(dispatcher.calls().is_empty());
}
