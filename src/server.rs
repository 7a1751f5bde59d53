//! The MCP protocol loop shared by every server binary.
//!
//! Reads line-delimited JSON-RPC 2.0 from stdin, dispatches to an [`Adapter`] and
//! writes replies (plus any resource notifications) to stdout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::adapters::{Adapter, Content};
use crate::error::{rpc_codes, McpError, Result};

/// Protocol revision announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// One incoming line, either a request or (without `id`) a notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`
    pub jsonrpc: String,
    /// Absent for notifications
    pub id: Option<JsonValue>,
    /// MCP method, e.g. `tools/call`
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Option<JsonValue>,
}

/// Reply to a request. Exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Echoed request id; `null` when the request could not be parsed
    pub id: Option<JsonValue>,
    /// Success payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Failure payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// One of [`rpc_codes`]
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Extra detail, unused so far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

/// Server-initiated notification.
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Notification method
    pub method: String,
    /// Notification parameters
    pub params: JsonValue,
}

impl JsonRpcNotification {
    /// `notifications/resources/updated` for a single URI.
    pub fn resource_updated(uri: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "notifications/resources/updated".to_string(),
            params: serde_json::json!({ "uri": uri }),
        }
    }
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<JsonValue>, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<JsonValue>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Create an error response from an McpError.
    pub fn from_error(id: Option<JsonValue>, err: McpError) -> Self {
        Self::error(id, err.rpc_code(), err.to_string())
    }
}

/// Body of a tools/call result.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    content: Vec<Content>,
    #[serde(rename = "isError")]
    is_error: bool,
}

/// MCP server.
pub struct McpServer<A: Adapter> {
    adapter: A,
    initialized: bool,
}

impl<A: Adapter> McpServer<A> {
    /// Create a new MCP server around the given adapter.
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            initialized: false,
        }
    }

    /// Access the wrapped adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Whether the client has sent `initialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server, reading from stdin and writing to stdout.
    pub async fn run(&mut self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve line-delimited JSON-RPC from `reader`, writing replies to `writer`.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        tracing::info!(server = self.adapter.server_name(), "serving MCP over stdio");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                // EOF - client disconnected
                tracing::debug!("client closed the connection");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            for message in self.handle_line(trimmed).await? {
                writer.write_all(message.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.flush().await?;
        }

        Ok(())
    }

    /// Handle one raw line and return the serialized messages to send back.
    pub async fn handle_line(&mut self, line: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                None,
                rpc_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            )),
        };

        if let Some(response) = response {
            out.push(serde_json::to_string(&response)?);
        }

        for uri in self.adapter.drain_resource_updates() {
            tracing::debug!(%uri, "resource updated");
            out.push(serde_json::to_string(&JsonRpcNotification::resource_updated(&uri))?);
        }

        Ok(out)
    }

    /// Handle a single JSON-RPC request.
    ///
    /// Returns `None` for notifications, which never get a response.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Validate JSON-RPC version
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                rpc_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version".to_string(),
            ));
        }

        if request.id.is_none() {
            match request.method.as_str() {
                "notifications/initialized" | "initialized" => {
                    tracing::debug!("client finished initialization");
                }
                "notifications/cancelled" => {
                    tracing::debug!("client cancelled a request");
                }
                other => tracing::debug!(method = other, "ignoring notification"),
            }
            return None;
        }

        tracing::debug!(method = %request.method, "handling request");

        // Route to appropriate handler
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "initialized" => JsonRpcResponse::success(request.id, JsonValue::Null),
            "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request).await,
            "prompts/list" => self.handle_prompts_list(request),
            "prompts/get" => self.handle_prompts_get(request).await,
            "resources/list" => self.handle_resources_list(request),
            "resources/read" => self.handle_resources_read(request).await,
            _ => JsonRpcResponse::error(
                request.id,
                rpc_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {}", request.method),
            ),
        };
        Some(response)
    }

    /// Handle the initialize request.
    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.initialized = true;

        let mut capabilities = Map::new();
        capabilities.insert("tools".to_string(), serde_json::json!({}));
        if !self.adapter.prompts().is_empty() {
            capabilities.insert("prompts".to_string(), serde_json::json!({}));
        }
        if !self.adapter.resources().is_empty() {
            capabilities.insert("resources".to_string(), serde_json::json!({}));
        }

        JsonRpcResponse::success(
            request.id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": capabilities,
                "serverInfo": {
                    "name": self.adapter.server_name(),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handle the tools/list request.
    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tools = self.adapter.tools();
        JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
    }

    /// Handle the tools/call request.
    async fn handle_tools_call(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let (name, arguments) = match named_params(&request.params, "arguments") {
            Ok(parsed) => parsed,
            Err(message) => {
                return JsonRpcResponse::error(request.id, rpc_codes::INVALID_PARAMS, message)
            }
        };

        match self.adapter.call_tool(&name, arguments).await {
            Ok(text) => tool_result(request.id, text, false),
            Err(err) if err.is_tool_failure() => {
                tracing::warn!(tool = %name, error = %err, "tool failed");
                tool_result(request.id, err.to_string(), true)
            }
            Err(err) => JsonRpcResponse::from_error(request.id, err),
        }
    }

    /// Handle the prompts/list request.
    fn handle_prompts_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let prompts = self.adapter.prompts();
        JsonRpcResponse::success(request.id, serde_json::json!({ "prompts": prompts }))
    }

    /// Handle the prompts/get request.
    async fn handle_prompts_get(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let (name, arguments) = match named_params(&request.params, "arguments") {
            Ok(parsed) => parsed,
            Err(message) => {
                return JsonRpcResponse::error(request.id, rpc_codes::INVALID_PARAMS, message)
            }
        };

        match self.adapter.get_prompt(&name, arguments).await {
            Ok(prompt) => match serde_json::to_value(prompt) {
                Ok(value) => JsonRpcResponse::success(request.id, value),
                Err(e) => JsonRpcResponse::from_error(request.id, e.into()),
            },
            Err(err) => JsonRpcResponse::from_error(request.id, err),
        }
    }

    /// Handle the resources/list request.
    fn handle_resources_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let resources = self.adapter.resources();
        JsonRpcResponse::success(request.id, serde_json::json!({ "resources": resources }))
    }

    /// Handle the resources/read request.
    async fn handle_resources_read(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let uri = match request
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(|u| u.as_str())
        {
            Some(uri) => uri.to_string(),
            None => {
                return JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_PARAMS,
                    "Missing 'uri' in params".to_string(),
                )
            }
        };

        let mime_type = self
            .adapter
            .resources()
            .into_iter()
            .find(|r| r.uri == uri)
            .map(|r| r.mime_type)
            .unwrap_or_else(|| "text/plain".to_string());

        match self.adapter.read_resource(&uri).await {
            Ok(text) => JsonRpcResponse::success(
                request.id,
                serde_json::json!({
                    "contents": [{
                        "uri": uri,
                        "mimeType": mime_type,
                        "text": text
                    }]
                }),
            ),
            Err(err) => JsonRpcResponse::from_error(request.id, err),
        }
    }
}

/// Extract `name` and an optional object-valued `field` from request params.
fn named_params(
    params: &Option<JsonValue>,
    field: &str,
) -> std::result::Result<(String, Map<String, JsonValue>), String> {
    let params = match params {
        Some(JsonValue::Object(obj)) => obj,
        _ => return Err("Missing params object".to_string()),
    };

    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing 'name' in params".to_string())?
        .to_string();

    let arguments = match params.get(field) {
        Some(JsonValue::Object(obj)) => obj.clone(),
        Some(JsonValue::Null) | None => Map::new(),
        _ => return Err(format!("'{}' must be an object", field)),
    };

    Ok((name, arguments))
}

fn tool_result(id: Option<JsonValue>, text: String, is_error: bool) -> JsonRpcResponse {
    let body = ToolCallResult {
        content: vec![Content::text(text)],
        is_error,
    };
    match serde_json::to_value(body) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::from_error(id, e.into()),
    }
}
