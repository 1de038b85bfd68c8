//! MCP Server Implementation
//!
//! This module contains the core MCP server implementation including:
//! - JSON-RPC 2.0 request/response structures
//! - Tool registry and dispatcher for the available tools
//! - Tool result envelope (content blocks plus the `isError` flag)
//! - STDIO server implementation for line-based communication
//! - Request handlers for MCP protocol methods

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::core::error::ServerError;
use crate::core::utils::ServerConfig;
use crate::math::MathEngine;
use crate::tools;

/// MCP protocol revision reported in initialize responses.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Standard MCP methods handled by this server.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
}

/// JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Process-wide server context.
///
/// Built once at startup and passed by reference to every handler. It holds
/// the server metadata used in MCP protocol responses and the tool registry.
pub struct AppState {
    /// Server name as reported in MCP initialize responses
    pub server_name: String,
    /// Server version string as reported in MCP initialize responses
    pub server_version: String,
    /// Registered tools and their handlers
    pub registry: ToolRegistry,
}

impl AppState {
    /// Create the server context and register all tools against `engine`.
    pub fn new(config: &ServerConfig, engine: Arc<dyn MathEngine>) -> Self {
        Self {
            server_name: config.name.clone(),
            server_version: config.version.clone(),
            registry: initialize_tools(engine),
        }
    }
}

/// JSON-RPC 2.0 request structure for MCP protocol.
///
/// All MCP requests follow the JSON-RPC 2.0 specification. The jsonrpc field
/// must be "2.0", id is optional (None for notifications), method specifies
/// the MCP method to call, and params contains method-specific parameters.
#[derive(Deserialize, Debug)]
pub struct MCPRequest {
    /// JSON-RPC version identifier, must be "2.0"
    #[allow(dead_code)]
    pub jsonrpc: String,
    /// Request ID for correlating responses. None indicates a notification.
    pub id: Option<Value>,
    /// MCP method name (e.g., "initialize", "tools/list", "tools/call")
    pub method: String,
    /// Method-specific parameters as JSON value
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure for MCP protocol.
///
/// Responses include jsonrpc "2.0", the id copied from the request, and
/// either a result or an error.
#[derive(Serialize, Debug)]
pub struct MCPResponse {
    /// JSON-RPC version identifier, always "2.0"
    pub jsonrpc: String,
    /// Request ID from the original request, null when it could not be read
    pub id: Option<Value>,
    /// Response result, present when request succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information, present when request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

impl MCPResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: MCPError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self::failure(id, MCPError::new(code, message))
    }
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MCPError {
    /// JSON-RPC error code (e.g., -32601 for method not found)
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MCPError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// The routing error for a tool name that is not registered.
    pub fn tool_not_found() -> Self {
        Self::new(error_codes::METHOD_NOT_FOUND, "Tool not found")
    }
}

/// MCP tool definition structure.
///
/// Each tool has a unique name, description, and JSON schema defining its
/// input parameters. Serialized as-is for `tools/list`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MCPTool {
    /// Unique tool identifier (e.g., "calculate", "derivative")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Arguments of a tool call, keyed by parameter name.
pub type ToolArguments = serde_json::Map<String, Value>;

/// The `params` of a `tools/call` request.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ToolRequest {
    /// Tool to invoke; not guaranteed to be registered
    pub name: String,
    /// Named arguments, empty when omitted
    #[serde(default)]
    pub arguments: Option<ToolArguments>,
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResponse {
    Success { text: String },
    Failure { text: String },
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        ToolResponse::Success { text: text.into() }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        ToolResponse::Failure { text: text.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResponse::Failure { .. })
    }

    /// Render into the MCP tool result envelope.
    pub fn into_result(self) -> CallToolResult {
        let is_error = self.is_error();
        let text = match self {
            ToolResponse::Success { text } | ToolResponse::Failure { text } => text,
        };
        CallToolResult {
            content: vec![ToolContent::Text { text }],
            is_error,
        }
    }
}

/// MCP `tools/call` result: typed content blocks plus the error flag.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Tool handler function type definition.
///
/// Tool handlers are boxed closures that take the call's arguments and
/// always produce a [`ToolResponse`]; failures are reported through
/// [`ToolResponse::Failure`], never by panicking.
pub type ToolHandler = Box<dyn Fn(&ToolArguments) -> ToolResponse + Send + Sync>;

/// Registry of available MCP tools.
///
/// The registry maintains a list of tool definitions for discovery, in
/// registration order, and a HashMap of tool names to their handler
/// functions for execution.
pub struct ToolRegistry {
    /// List of all registered tools (for tools/list method)
    tools: Vec<MCPTool>,
    /// Map of tool names to their handler functions (for tools/call method)
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool with the registry.
    ///
    /// # Arguments
    /// * `tool` - Tool definition with name, description, and input schema
    /// * `handler` - Function that executes the tool when called
    pub fn register(&mut self, tool: MCPTool, handler: ToolHandler) {
        let name = tool.name.clone();
        self.tools.push(tool);
        self.handlers.insert(name, handler);
    }

    /// Tool descriptors in registration order.
    pub fn descriptors(&self) -> &[MCPTool] {
        &self.tools
    }

    /// Route a tool call to its handler by exact name match.
    ///
    /// Returns the tool-not-found routing error for unregistered names;
    /// everything else, including validation and computation failures, comes
    /// back as a [`ToolResponse`].
    pub fn dispatch(&self, request: &ToolRequest) -> Result<ToolResponse, MCPError> {
        let handler = self
            .handlers
            .get(&request.name)
            .ok_or_else(MCPError::tool_not_found)?;
        let empty = ToolArguments::new();
        let arguments = request.arguments.as_ref().unwrap_or(&empty);
        Ok(handler(arguments))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize and register all tools.
///
/// Registration order is the order reported by `tools/list`.
pub fn initialize_tools(engine: Arc<dyn MathEngine>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    tools::calculate::register(&mut registry, Arc::clone(&engine));
    tools::derivative::register(&mut registry, engine);
    registry
}

/// Handle MCP initialize method.
///
/// The initialize method is the first method called by MCP clients to establish
/// a connection. It returns the protocol version, server capabilities, and
/// server information.
///
/// # Arguments
/// * `state` - Application state containing server name and version
/// * `id` - Request ID from the client
fn handle_initialize(state: &AppState, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": state.server_name,
                "version": state.server_version
            }
        }),
    )
}

/// Handle MCP tools/list method.
///
/// Returns every registered tool with its name, description and input
/// schema, in registration order.
fn handle_tools_list(state: &AppState, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(id, json!({ "tools": state.registry.descriptors() }))
}

/// Handle MCP tools/call method.
///
/// The tool name and arguments are extracted from the params and routed
/// through the registry. Tool results, including tool-level failures, are
/// returned as a `result`; only malformed params and unknown tools produce a
/// JSON-RPC `error`.
///
/// # Arguments
/// * `state` - Application state holding the tool registry
/// * `id` - Request ID from the client
/// * `params` - Method parameters containing tool name and arguments
fn handle_tools_call(state: &AppState, id: Option<Value>, params: Option<Value>) -> MCPResponse {
    let Some(params) = params else {
        return MCPResponse::error(id, error_codes::INVALID_PARAMS, "Invalid params");
    };

    let request: ToolRequest = match serde_json::from_value(params) {
        Ok(request) => request,
        Err(e) => {
            return MCPResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            );
        }
    };

    let response = match state.registry.dispatch(&request) {
        Ok(response) => response,
        Err(error) => {
            tracing::debug!(tool = %request.name, "tool not found");
            return MCPResponse::failure(id, error);
        }
    };
    tracing::debug!(tool = %request.name, is_error = response.is_error(), "tool call finished");

    match serde_json::to_value(response.into_result()) {
        Ok(result) => MCPResponse::success(id, result),
        Err(e) => MCPResponse::error(id, error_codes::INTERNAL_ERROR, format!("Internal error: {}", e)),
    }
}

/// Route a decoded request to its method handler.
///
/// Returns `None` for notifications (requests without an id), which never
/// get a response.
pub fn handle_request(state: &AppState, request: MCPRequest) -> Option<MCPResponse> {
    let Some(id) = request.id else {
        if request.method == methods::INITIALIZED {
            tracing::debug!("client finished initialization");
        } else {
            tracing::debug!(method = %request.method, "ignoring notification");
        }
        return None;
    };
    let id = Some(id);

    tracing::debug!(method = %request.method, "handling request");
    let response = match request.method.as_str() {
        methods::INITIALIZE => handle_initialize(state, id),
        methods::PING => MCPResponse::success(id, json!({})),
        methods::LIST_TOOLS => handle_tools_list(state, id),
        methods::CALL_TOOL => handle_tools_call(state, id, request.params),
        other => MCPResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ),
    };
    Some(response)
}

/// Decode one input line and produce its response, if any.
///
/// Lines that are not JSON get a parse error with a null id. JSON that is
/// not a valid request gets an invalid-request error, echoing the id when
/// one can be recovered.
pub fn handle_line(state: &AppState, line: &str) -> Option<MCPResponse> {
    match serde_json::from_str::<MCPRequest>(line) {
        Ok(request) => handle_request(state, request),
        Err(e) => match serde_json::from_str::<Value>(line) {
            Ok(partial) => {
                tracing::warn!("Invalid request: {}", e);
                let id = partial.get("id").cloned().filter(|id| !id.is_null());
                Some(MCPResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                ))
            }
            Err(_) => {
                tracing::warn!("Parse error: {}", e);
                Some(MCPResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        },
    }
}

/// Serve MCP requests from `reader`, writing responses to `writer`.
///
/// Requests are processed one at a time: a line is read, its response is
/// written and flushed, and only then is the next line read. A line that is
/// not valid UTF-8 gets a parse error like any other undecodable line.
/// Returns when the reader reaches end of input.
pub async fn serve<R, W>(state: &AppState, mut reader: R, mut writer: W) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buffer) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                handle_line(state, line)
            }
            Err(e) => {
                tracing::warn!("Parse error: {}", e);
                Some(MCPResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        };
        let Some(response) = response else {
            continue;
        };

        // Each response must be on a single line followed by newline
        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    tracing::debug!("input closed");
    Ok(())
}

/// Run the MCP server in STDIO mode.
///
/// Reads JSON-RPC requests line-by-line from stdin and writes responses to
/// stdout. All logging goes to stderr to avoid interfering with the JSON-RPC
/// protocol stream.
pub async fn run_server_stdio(state: AppState) -> Result<(), ServerError> {
    tracing::info!(
        name = %state.server_name,
        version = %state.server_version,
        protocol = PROTOCOL_VERSION,
        "Math MCP server started (STDIO mode)"
    );

    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve(&state, stdin, stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Engine;
    use pretty_assertions::assert_eq;

    fn state() -> AppState {
        let config = ServerConfig {
            name: "test-server".to_string(),
            version: "9.9.9".to_string(),
        };
        AppState::new(&config, Arc::new(Engine))
    }

    fn call(state: &AppState, line: &str) -> Value {
        let response = handle_line(state, line).expect("expected a response");
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn initialize_reports_server_info() {
        let state = state();
        let response = call(&state, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);
        assert_eq!(
            response,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "test-server", "version": "9.9.9" }
                }
            })
        );
    }

    #[test]
    fn lists_both_tools_in_order() {
        let state = state();
        for _ in 0..2 {
            let response = call(&state, r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#);
            let tools = response["result"]["tools"].as_array().unwrap();
            let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
            assert_eq!(names, vec!["calculate", "derivative"]);
            assert_eq!(tools[0]["inputSchema"]["required"], json!(["expression"]));
            assert_eq!(tools[1]["inputSchema"]["required"], json!(["expression", "variable"]));
        }
    }

    #[test]
    fn call_tool_propagates_request_id() {
        let state = state();
        let response = call(
            &state,
            r#"{"jsonrpc":"2.0","id":42,"method":"tools/call","params":{"name":"calculate","arguments":{"expression":"2 + 2"}}}"#,
        );
        assert_eq!(
            response,
            json!({
                "jsonrpc": "2.0",
                "id": 42,
                "result": {
                    "content": [{ "type": "text", "text": "The result of the expression is: 4" }],
                    "isError": false
                }
            })
        );
    }

    #[test]
    fn tool_failures_are_results_not_errors() {
        let state = state();
        let response = call(
            &state,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"calculate","arguments":{}}}"#,
        );
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], json!(true));
        assert_eq!(
            response["result"]["content"][0]["text"],
            json!("Error: Expression is required")
        );
    }

    #[test]
    fn unknown_tool_is_a_protocol_error() {
        let state = state();
        let response = call(
            &state,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"integrate","arguments":{}}}"#,
        );
        assert_eq!(
            response,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "error": { "code": -32601, "message": "Tool not found" }
            })
        );
    }

    #[test]
    fn malformed_calls_are_rejected() {
        let state = state();
        let response = call(&state, r#"{"jsonrpc":"2.0","id":1,"method":"tools/call"}"#);
        assert_eq!(response["error"]["code"], json!(-32602));

        let response = call(
            &state,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"arguments":{}}}"#,
        );
        assert_eq!(response["error"]["code"], json!(-32602));

        let response = call(&state, r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#);
        assert_eq!(
            response["error"],
            json!({ "code": -32601, "message": "Method not found: resources/list" })
        );
    }

    #[test]
    fn notifications_get_no_response() {
        let state = state();
        assert!(handle_line(&state, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
        assert!(handle_line(&state, r#"{"jsonrpc":"2.0","method":"tools/list"}"#).is_none());
    }

    #[test]
    fn garbage_input_gets_parse_or_request_errors() {
        let state = state();
        let response = call(&state, "{not json");
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], json!(-32700));

        let response = call(&state, r#"{"jsonrpc":"2.0","id":5}"#);
        assert_eq!(response["id"], json!(5));
        assert_eq!(response["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn serves_one_response_per_request_line() {
        let state = state();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"derivative","arguments":{"expression":"sin(x)","variable":"x"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        serve(&state, input.as_bytes(), &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], json!(1));
        assert_eq!(responses[1]["id"], json!(2));
        assert_eq!(
            responses[1]["result"]["content"][0]["text"],
            json!("The derivative of sin(x) with respect to x is: cos(x)")
        );
        assert_eq!(responses[2], json!({ "jsonrpc": "2.0", "id": 3, "result": {} }));
    }

    #[tokio::test]
    async fn keeps_serving_after_undecodable_bytes() {
        let state = state();
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.push(b'\n');
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);

        let mut output = Vec::new();
        serve(&state, input.as_slice(), &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], json!(1));
        assert_eq!(responses[1]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["code"], json!(-32700));
        assert_eq!(responses[2], json!({ "jsonrpc": "2.0", "id": 2, "result": {} }));
    }
}
