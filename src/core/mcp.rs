//! JSON-RPC 2.0 envelopes and the MCP protocol surface shared by both transports.
//!
//! Decoding classifies every incoming element up front: a message either carries an `id`
//! (a [`Message::Call`], which always gets a response) or it does not (a
//! [`Message::Notification`], which never does). Elements that are not valid JSON-RPC are
//! turned into ready-made error responses so the dispatcher never sees them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as J};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2025-03-26";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

pub type JsonObject = Map<String, J>;

/// JSON-RPC request id: string, number, or an explicit null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
    Null,
}

impl RequestId {
    fn from_value(v: J) -> Option<Self> {
        match v {
            J::Number(n) => Some(Self::Number(n)),
            J::String(s) => Some(Self::String(s)),
            J::Null => Some(Self::Null),
            _ => None,
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Call {
        id: RequestId,
        method: String,
        params: J,
    },
    Notification {
        method: String,
        params: J,
    },
}

impl Message {
    pub fn method(&self) -> &str {
        match self {
            Message::Call { method, .. } | Message::Notification { method, .. } => method,
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Message::Call { id, .. } => Some(id),
            Message::Notification { .. } => None,
        }
    }
}

/// One decoded element of an incoming payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Valid(Message),
    /// Structurally invalid element, already converted into its error response.
    Invalid(RpcResp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Single(Entry),
    Batch(Vec<Entry>),
}

/// Decode raw bytes into a single message or a batch.
///
/// Only undecodable JSON is an `Err` (a ParseError response with a null id); every other
/// problem is reported per element as [`Entry::Invalid`].
pub fn decode(raw: &str) -> Result<Incoming, RpcResp> {
    let value: J =
        serde_json::from_str(raw).map_err(|e| parse_error(format!("Parse error: {e}")))?;
    Ok(decode_value(value))
}

pub fn decode_value(value: J) -> Incoming {
    match value {
        J::Array(items) if items.is_empty() => Incoming::Single(Entry::Invalid(err(
            RequestId::Null,
            INVALID_REQUEST,
            "Invalid Request: empty batch",
            None,
        ))),
        J::Array(items) => Incoming::Batch(items.into_iter().map(classify).collect()),
        other => Incoming::Single(classify(other)),
    }
}

fn classify(value: J) -> Entry {
    let J::Object(mut obj) = value else {
        return invalid(RequestId::Null, "request must be a JSON object");
    };
    let id = match obj.remove("id") {
        None => None,
        Some(raw) => match RequestId::from_value(raw) {
            Some(id) => Some(id),
            None => return invalid(RequestId::Null, "id must be a string, number or null"),
        },
    };
    let echo = id.clone().unwrap_or(RequestId::Null);
    if obj.get("jsonrpc").and_then(J::as_str) != Some(JSONRPC_VERSION) {
        return invalid(echo, "jsonrpc must be \"2.0\"");
    }
    let method = match obj.remove("method") {
        Some(J::String(m)) => m,
        _ => return invalid(echo, "method must be a string"),
    };
    let params = obj.remove("params").unwrap_or(J::Null);
    Entry::Valid(match id {
        Some(id) => Message::Call { id, method, params },
        None => Message::Notification { method, params },
    })
}

fn invalid(id: RequestId, detail: &str) -> Entry {
    Entry::Invalid(err(id, INVALID_REQUEST, format!("Invalid Request: {detail}"), None))
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RpcResp {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<J>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErr>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RpcErr {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<J>,
}

/// What a transport writes back: one response, or the non-empty array for a batch.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Outgoing {
    Single(RpcResp),
    Batch(Vec<RpcResp>),
}

pub fn ok(id: RequestId, result: J) -> RpcResp {
    RpcResp { jsonrpc: JSONRPC_VERSION, id, result: Some(result), error: None }
}

pub fn err(id: RequestId, code: i32, msg: impl Into<String>, data: Option<J>) -> RpcResp {
    RpcResp {
        jsonrpc: JSONRPC_VERSION,
        id,
        result: None,
        error: Some(RpcErr { code, message: msg.into(), data }),
    }
}

pub fn parse_error(msg: impl Into<String>) -> RpcResp {
    err(RequestId::Null, PARSE_ERROR, msg, None)
}

// --- MCP handshake shapes ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Client-declared metadata from `initialize`; kept for diagnostics only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolsCapability {}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: &'static str,
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
}
