//! MCP server: newline-delimited JSON-RPC over stdio.
//!
//! One request is processed at a time, in arrival order; responses go to
//! stdout, diagnostics to stderr via tracing. The search client is built
//! once at startup. Construction failure does not abort the server: tools
//! then answer with an initialization error payload so the caller sees what
//! happened.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::client::SearchClient;
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools;

pub struct McpServer {
    client: Option<Arc<SearchClient>>,
}

/// What the transport loop should do after a line is handled.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue,
    Shutdown,
}

impl McpServer {
    /// Build the server, attempting to construct the search client.
    pub fn from_config(config: &Config) -> Self {
        let client = match SearchClient::from_config(config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::error!("failed to initialize search client: {e}");
                None
            }
        };
        Self { client }
    }

    /// Test constructor with an explicit (possibly absent) client.
    pub fn with_client(client: Option<SearchClient>) -> Self {
        Self {
            client: client.map(Arc::new),
        }
    }

    /// Serve requests from stdin until EOF or `shutdown`.
    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        tracing::info!("MCP server listening on stdio");

        loop {
            let line = lines.next_line().await.map_err(|e| BridgeError::Io {
                source: e,
                context: "Failed to read from stdin".to_string(),
            })?;

            let Some(line) = line else {
                tracing::info!("stdin closed, exiting");
                break;
            };

            let (response, flow) = self.handle_line(&line).await;

            if let Some(response) = response {
                let write = async {
                    stdout.write_all(response.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await
                };
                write.await.map_err(|e| BridgeError::Io {
                    source: e,
                    context: "Failed to write response to stdout".to_string(),
                })?;
            }

            if flow == Flow::Shutdown {
                tracing::info!("shutdown requested, exiting");
                break;
            }
        }

        Ok(())
    }

    /// Handle one input line; returns the serialized response, if any.
    pub async fn handle_line(&self, line: &str) -> (Option<String>, Flow) {
        let line = line.trim();
        if line.is_empty() {
            return (None, Flow::Continue);
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("unparseable request: {e}");
                let response =
                    JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
                return (encode(&response), Flow::Continue);
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            let response = JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            );
            return (encode(&response), Flow::Continue);
        }

        // Notifications get no response.
        let Some(id) = request.id.clone() else {
            tracing::debug!("notification: {}", request.method);
            return (None, Flow::Continue);
        };

        let (response, flow) = self.dispatch(id, &request).await;
        (encode(&response), flow)
    }

    async fn dispatch(&self, id: Value, request: &JsonRpcRequest) -> (JsonRpcResponse, Flow) {
        match request.method.as_str() {
            "initialize" => {
                let result = json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                });
                (JsonRpcResponse::success(id, result), Flow::Continue)
            }
            "ping" => (JsonRpcResponse::success(id, json!({})), Flow::Continue),
            "tools/list" => {
                let result = json!({"tools": tools::tool_definitions()});
                (JsonRpcResponse::success(id, result), Flow::Continue)
            }
            "tools/call" => (self.call_tool(id, request.params.as_ref()).await, Flow::Continue),
            "shutdown" => (JsonRpcResponse::success(id, Value::Null), Flow::Shutdown),
            other => (
                JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {other}"),
                ),
                Flow::Continue,
            ),
        }
    }

    async fn call_tool(&self, id: Value, params: Option<&Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool call parameters");
        };

        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name");
        };

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        match tools::call_tool(self.client.as_deref(), name, arguments).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(BridgeError::InvalidInput(message)) => {
                JsonRpcResponse::error(id, INVALID_PARAMS, message)
            }
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }
}

fn encode(response: &JsonRpcResponse) -> Option<String> {
    match serde_json::to_string(response) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            tracing::error!("failed to encode response: {e}");
            None
        }
    }
}
