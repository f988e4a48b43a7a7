//! Transport-independent JSON-RPC method table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::{json, Value as J};

use crate::core::error::{RpcError, ToolError};
use crate::core::mcp::{
    err, ok, ClientInfo, Entry, Incoming, InitializeResult, JsonObject, Message, Outgoing, RpcResp,
    ServerCapabilities, ServerInfo, PROTOCOL_VERSION,
};
use crate::infra::logging;
use crate::infra::runtime::session::SessionStore;
use crate::tools::registry::ToolRegistry;

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    sessions: Arc<dyn SessionStore>,
    server_info: ServerInfo,
    call_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { registry, sessions, server_info: ServerInfo::default(), call_timeout: None }
    }

    /// Bound every `tools/call`; `None` waits for the tool indefinitely.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Process one decoded payload for `session_id`.
    ///
    /// Returns `None` when nothing must be written back: a lone notification, or a batch made
    /// only of notifications.
    pub async fn handle(&self, incoming: Incoming, session_id: &str) -> Option<Outgoing> {
        match incoming {
            Incoming::Single(entry) => self.handle_entry(entry, session_id).await.map(Outgoing::Single),
            Incoming::Batch(entries) => {
                let responses: Vec<RpcResp> =
                    join_all(entries.into_iter().map(|e| self.handle_entry(e, session_id)))
                        .await
                        .into_iter()
                        .flatten()
                        .collect();
                (!responses.is_empty()).then_some(Outgoing::Batch(responses))
            }
        }
    }

    async fn handle_entry(&self, entry: Entry, session_id: &str) -> Option<RpcResp> {
        match entry {
            Entry::Invalid(resp) => Some(resp),
            Entry::Valid(msg) => self.handle_message(msg, session_id).await,
        }
    }

    pub async fn handle_message(&self, msg: Message, session_id: &str) -> Option<RpcResp> {
        logging::count("mcp_requests_total", "method", method_label(msg.method()));
        match msg {
            Message::Call { id, method, params } => {
                tracing::debug!(%method, id = ?id, session_id, "rpc call");
                Some(match self.execute(&method, params, session_id).await {
                    Ok(result) => ok(id, result),
                    Err(e) => {
                        tracing::debug!(%method, code = e.code, error = %e.message, "rpc error");
                        err(id, e.code, e.message, e.data)
                    }
                })
            }
            Message::Notification { method, params } => {
                tracing::debug!(%method, session_id, "rpc notification");
                if let Err(e) = self.execute(&method, params, session_id).await {
                    tracing::warn!(%method, code = e.code, error = %e.message, "notification failed");
                }
                None
            }
        }
    }

    async fn execute(&self, method: &str, params: J, session_id: &str) -> Result<J, RpcError> {
        match method {
            "initialize" => self.initialize(&params, session_id),
            "notifications/initialized" => {
                self.sessions.mark_initialized(session_id, None);
                Ok(json!({ "acknowledged": true }))
            }
            "tools/list" => {
                let snapshot = self.registry.discover(false).await;
                Ok(json!({ "tools": snapshot.mcp_tools() }))
            }
            "tools/call" => self.call_tool(params).await,
            "ping" => Ok(json!({ "pong": true })),
            other => Err(RpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: &J, session_id: &str) -> Result<J, RpcError> {
        let client_info = params
            .get("clientInfo")
            .and_then(|v| serde_json::from_value::<ClientInfo>(v.clone()).ok());
        if let Some(info) = &client_info {
            tracing::info!(client = %info.name, version = %info.version, session_id, "client initialized");
        }
        self.sessions.mark_initialized(session_id, client_info);
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            server_info: self.server_info.clone(),
            capabilities: ServerCapabilities::default(),
        };
        serde_json::to_value(result).map_err(|e| RpcError::internal(e.to_string()))
    }

    async fn call_tool(&self, params: J) -> Result<J, RpcError> {
        let mut params = match params {
            J::Object(map) => map,
            J::Null => JsonObject::new(),
            _ => return Err(RpcError::invalid_params("params must be an object")),
        };
        let name = match params.remove("name") {
            Some(J::String(name)) => name,
            Some(_) => return Err(RpcError::invalid_params("Tool name must be a string")),
            None => return Err(RpcError::invalid_params("Missing required parameter: name")),
        };
        let args = match params.remove("arguments") {
            None | Some(J::Null) => JsonObject::new(),
            Some(J::Object(args)) => args,
            Some(_) => return Err(RpcError::invalid_params("arguments must be an object")),
        };

        let snapshot = self.registry.discover(false).await;
        let label = if snapshot.find(&name).is_some() { name.as_str() } else { "unknown" };
        let start = Instant::now();
        let run = snapshot.execute(&name, args);
        let res = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .unwrap_or_else(|_| Err(ToolError::Timeout(limit))),
            None => run.await,
        };
        logging::log_metric(label, "tool_call_latency_ms", start.elapsed().as_millis() as f64);

        match res {
            Ok(content) => {
                logging::tool_outcome(label, true);
                serde_json::to_value(content).map_err(|e| RpcError::internal(e.to_string()))
            }
            Err(e) => {
                logging::tool_outcome(label, false);
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                Err(e.into())
            }
        }
    }
}

/// Metric label for a client-supplied method name; anything outside the method table is `unknown`.
fn method_label(method: &str) -> &'static str {
    match method {
        "initialize" => "initialize",
        "notifications/initialized" => "notifications/initialized",
        "tools/list" => "tools/list",
        "tools/call" => "tools/call",
        "ping" => "ping",
        _ => "unknown",
    }
}
