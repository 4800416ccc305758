//! MCP over line-delimited JSON-RPC 2.0.
//!
//! [`McpServer`] reads one request per line and answers on the writer it was
//! given; [`all_tools`] declares the `forms_*` tool schemas advertised by
//! `tools/list`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// Incoming JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, `"2.0"`.
    pub jsonrpc: String,
    /// Absent for notifications.
    pub id: Option<Value>,
    /// Method name, e.g. `tools/call`.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// Outgoing JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier (null when the request could not be read).
    pub id: Value,
    /// Set on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error member.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// `-32700` parse error, `-32601` unknown method, `-32602` bad params, `-32603` internal.
    pub code: i32,
    /// Error description.
    pub message: String,
    /// Extra detail, unused so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Name and version reported by `initialize`.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
}

/// Capabilities advertised by `initialize`.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    /// Tool support.
    pub tools: ToolCapabilities,
}

/// The tool list is fixed for the life of the process.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Always false.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// `initialize` result.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    /// Protocol revision spoken by this server.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// What the server supports.
    pub capabilities: Capabilities,
    /// Who is answering.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// One entry of `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Name passed back in `tools/call`.
    pub name: String,
    /// Shown to the client model.
    pub description: String,
    /// JSON Schema of the arguments object.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// `tools/call` params.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Tool to run.
    pub name: String,
    /// Tool arguments, if any.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// One content block of a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    /// Always `text`.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Pretty JSON on success, the error message on failure.
    pub text: String,
}

/// `tools/call` result.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// Result blocks.
    pub content: Vec<ToolResultContent>,
    /// Present and true when the tool failed.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP Server running over stdio.
///
/// Reads one JSON-RPC message per line and writes one response per line.
/// Notifications get no response.
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Adaptive feedback MCP server starting...");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve line-delimited JSON-RPC until `reader` reaches EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request.
    ///
    /// Returns `None` for notifications (requests without an id).
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" | "notifications/initialized" => {
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "tools": all_tools()
            }),
        )
    }

    /// Handle tools/call request
    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let (content, is_error) =
            match handle_tool_call(&self.state, &params.name, params.arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                        error!(error = %e, "Failed to serialize tool result");
                        format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                    });
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text,
                        },
                        None,
                    )
                }
                Err(e) => (
                    ToolResultContent {
                        content_type: "text".to_string(),
                        text: format!("Error: {}", e),
                    },
                    Some(true),
                ),
            };

        let tool_result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }
}

/// Every tool the server exposes, in listing order.
pub fn all_tools() -> Vec<Tool> {
    vec![
        get_generate_tool(),
        get_get_tool(),
        get_list_tool(),
        get_set_active_tool(),
        get_follow_up_tool(),
        get_submit_tool(),
        get_submission_get_tool(),
        get_submissions_tool(),
        get_strategy_tool(),
    ]
}

fn form_id_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "Form identifier (ai_...)"
    })
}

/// Schema accepted for an answer value.
fn answer_schema() -> Value {
    serde_json::json!({
        "oneOf": [
            {"type": "string"},
            {"type": "number"},
            {"type": "array", "items": {"type": "string"}}
        ],
        "description": "Answer: text, a number, or a list of option labels"
    })
}

/// Get the form generation tool definition
fn get_generate_tool() -> Tool {
    Tool {
        name: "forms_generate".to_string(),
        description: "Generate a feedback form from a free-text description of a product or service.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "minLength": 1,
                    "description": "What the feedback is about"
                }
            },
            "required": ["description"],
            "additionalProperties": false
        }),
    }
}

fn get_get_tool() -> Tool {
    Tool {
        name: "forms_get".to_string(),
        description: "Get a form with all root and follow-up questions.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "form_id": form_id_property()
            },
            "required": ["form_id"],
            "additionalProperties": false
        }),
    }
}

fn get_list_tool() -> Tool {
    Tool {
        name: "forms_list".to_string(),
        description: "List all forms, newest first.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

fn get_set_active_tool() -> Tool {
    Tool {
        name: "forms_set_active".to_string(),
        description: "Retire or reactivate a form.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "form_id": form_id_property(),
                "active": {
                    "type": "boolean",
                    "description": "false retires the form, true reactivates it"
                }
            },
            "required": ["form_id", "active"],
            "additionalProperties": false
        }),
    }
}

/// Get the follow-up tool definition
fn get_follow_up_tool() -> Tool {
    Tool {
        name: "forms_follow_up".to_string(),
        description: "Record an answer to a root question and append generated follow-up questions to the form. Answers to follow-up questions generate nothing.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "form_id": form_id_property(),
                "question_id": {
                    "type": "string",
                    "description": "The answered question"
                },
                "answer": answer_schema(),
                "history": {
                    "type": "array",
                    "description": "Answers given earlier in the same session",
                    "items": {
                        "type": "object",
                        "properties": {
                            "questionId": {"type": "string"},
                            "question": {"type": "string"},
                            "answer": answer_schema()
                        },
                        "required": ["answer"]
                    }
                }
            },
            "required": ["form_id", "question_id", "answer"],
            "additionalProperties": false
        }),
    }
}

fn get_submit_tool() -> Tool {
    Tool {
        name: "forms_submit".to_string(),
        description: "Record a completed set of responses for a form.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "form_id": form_id_property(),
                "responses": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "questionId": {"type": "string"},
                            "answer": answer_schema(),
                            "answeredAt": {"type": "string", "format": "date-time"}
                        },
                        "required": ["questionId", "answer"]
                    }
                }
            },
            "required": ["form_id", "responses"],
            "additionalProperties": false
        }),
    }
}

fn get_submission_get_tool() -> Tool {
    Tool {
        name: "forms_submission_get".to_string(),
        description: "Get one submission by id.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "submission_id": {
                    "type": "string",
                    "description": "Submission identifier"
                }
            },
            "required": ["submission_id"],
            "additionalProperties": false
        }),
    }
}

/// Get the submissions-and-analytics tool definition
fn get_submissions_tool() -> Tool {
    Tool {
        name: "forms_submissions".to_string(),
        description: "Get a form's submissions with per-question answer distributions, optionally with a generated narrative report.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "form_id": form_id_property(),
                "narrative": {
                    "type": "boolean",
                    "description": "Include a generated narrative report (default: false)"
                }
            },
            "required": ["form_id"],
            "additionalProperties": false
        }),
    }
}

fn get_strategy_tool() -> Tool {
    Tool {
        name: "forms_strategy".to_string(),
        description: "Generate a strategic analysis of a form's submissions. Returns status pending when there are none yet.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "form_id": form_id_property()
            },
            "required": ["form_id"],
            "additionalProperties": false
        }),
    }
}
