//! MCP server exposing the catalog tools over stdio.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, ToolContent,
    ToolDefinition, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::dispatch::{CallDispatcher, OutboundCallResult};
use crate::error::BridgeError;
use crate::tools::ToolInvocation;

/// JSON-RPC front end over a [`CallDispatcher`].
pub struct McpServer {
    dispatcher: Arc<CallDispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<CallDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Serve stdin/stdout until EOF or `shutdown`.
    pub async fn run_stdio(self: Arc<Self>) -> Result<(), BridgeError> {
        tracing::info!("Starting MCP server with stdio transport");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve line-delimited requests from `reader`, writing responses to `writer`.
    ///
    /// Each `tools/call` runs on its own task, so a call blocked on device
    /// authorization does not stall other requests. Responses are written by a
    /// single task and may arrive out of request order.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<(), BridgeError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_vec(&response)?;
                line.push(b'\n');
                writer.write_all(&line).await?;
                writer.flush().await?;
            }
            Ok::<(), BridgeError>(())
        });

        let mut calls = JoinSet::new();
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let request: JsonRpcRequest = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(error = %err, "unparseable request");
                    let _ = tx.send(JsonRpcResponse::error(
                        None,
                        PARSE_ERROR,
                        format!("Parse error: {err}"),
                    ));
                    continue;
                }
            };

            let shutdown = request.method == "shutdown";
            if request.method == "tools/call" {
                let server = Arc::clone(&self);
                let tx = tx.clone();
                calls.spawn(async move {
                    if let Some(response) = server.handle_request(request).await {
                        let _ = tx.send(response);
                    }
                });
                while calls.try_join_next().is_some() {}
            } else if let Some(response) = self.handle_request(request).await {
                let _ = tx.send(response);
            }
            if shutdown {
                break;
            }
        }

        while calls.join_next().await.is_some() {}
        drop(tx);
        writer_task
            .await
            .map_err(|err| BridgeError::Io(std::io::Error::other(err)))?
    }

    /// Handle one request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification");
            return None;
        }
        let id = request.id.clone();

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                },
                "capabilities": {
                    "tools": { "listChanged": false }
                }
            }),
        )
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<ToolDefinition> = self
            .dispatcher
            .catalog()
            .iter()
            .map(ToolDefinition::from)
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(err)) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {err}"))
            }
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let invocation = ToolInvocation::new(params.name, params.arguments);
        let result = self.dispatcher.dispatch(&invocation).await;
        let (text, is_error) = match &result {
            OutboundCallResult::Success { payload, .. } => (render(payload), false),
            OutboundCallResult::Failure(error) => (render(&json!(error)), true),
        };
        let response = CallToolResponse {
            content: vec![ToolContent::Text { text }],
            is_error,
        };
        JsonRpcResponse::success(id, json!(response))
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
