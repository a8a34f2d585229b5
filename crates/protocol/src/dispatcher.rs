//! Maps JSON-RPC frames onto the tool registry.
//!
//! Transport faults (bad JSON, unknown method, bad params) come back as
//! JSON-RPC error objects. Failures inside a tool handler are business
//! results and come back as `isError: true` content instead.

use std::sync::Arc;

use agentgate_core::tool::ToolRegistry;
use serde_json::Value;
use tracing::{debug, warn};

use crate::jsonrpc::{
    InitializeResult, JSONRPC_VERSION, PROTOCOL_VERSION, Response, RpcError, ServerCapabilities,
    ServerInfo, ToolCallParams, ToolCallResult, ToolsCapability, ToolsListResult,
};

/// Stateless request handler over a shared registry.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, server_info: ServerInfo) -> Self {
        Self {
            registry,
            server_info,
        }
    }

    /// Dispatcher identified by this crate's name and version.
    pub fn with_default_info(registry: Arc<ToolRegistry>) -> Self {
        Self::new(
            registry,
            ServerInfo {
                name: "agentgate".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        )
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Handle one raw line. Returns `None` for notifications and blank lines.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!(error = %e, "Unparsable JSON-RPC frame");
                Some(Response::failure(Value::Null, RpcError::parse_error(e)))
            }
        }
    }

    /// Handle one decoded frame.
    pub async fn handle_value(&self, value: Value) -> Option<Response> {
        let Value::Object(mut frame) = value else {
            return Some(Response::failure(
                Value::Null,
                RpcError::invalid_request("frame must be a JSON object"),
            ));
        };

        // Presence of the key decides request vs notification; an explicit
        // null id still gets a reply.
        let id = frame.remove("id");

        if frame.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Some(Response::failure(
                id.unwrap_or(Value::Null),
                RpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }

        let Some(method) = frame.get("method").and_then(Value::as_str).map(str::to_owned) else {
            return Some(Response::failure(
                id.unwrap_or(Value::Null),
                RpcError::invalid_request("missing method"),
            ));
        };
        let params = frame.remove("params");

        debug!(method = %method, notification = id.is_none(), "JSON-RPC frame");
        let outcome = self.dispatch(&method, params).await;

        let id = id?;
        Some(match outcome {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::failure(id, error),
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        match method {
            "initialize" => to_result(&InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability::default()),
                },
                server_info: self.server_info.clone(),
            }),
            "notifications/initialized" | "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_result(&ToolsListResult {
                tools: self.registry.list_tools(),
            }),
            "tools/call" => self.call_tool(params).await,
            other => Err(RpcError::method_not_found(other)),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: ToolCallParams = params
            .ok_or_else(|| RpcError::invalid_params("missing params"))
            .and_then(|p| serde_json::from_value(p).map_err(RpcError::invalid_params))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| RpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(Default::default()));

        let result = match tool.execute(arguments).await {
            Ok(text) => ToolCallResult::text(text, false),
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool handler failed");
                ToolCallResult::text(e.to_string(), true)
            }
        };
        to_result(&result)
    }
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(RpcError::internal)
}
