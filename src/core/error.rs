use std::time::Duration;

use serde_json::Value as J;
use thiserror::Error;

use crate::clients::admin_api::ClientError;
use crate::core::mcp::{RpcErr, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};

/// A JSON-RPC error object as a Rust error; what every dispatcher method fails with.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<J>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn into_wire(self) -> RpcErr {
        RpcErr { code: self.code, message: self.message, data: self.data }
    }
}

/// Failures raised while looking up, validating, or invoking a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("admin API is not configured; set ADMIN_API_BASE_URL to enable `{0}`")]
    NotConfigured(String),
    #[error(transparent)]
    Upstream(#[from] ClientError),
    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),
    /// A failure that carries its own JSON-RPC code.
    #[error("{message}")]
    Coded {
        code: i32,
        message: String,
        data: Option<J>,
    },
}

impl ToolError {
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            ToolError::Coded { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ToolError> for RpcError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Coded { code, message, data } => RpcError { code, message, data },
            other => RpcError::internal(other.to_string()),
        }
    }
}

/// Why a tool source could not produce a usable descriptor during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolLoadError {
    #[error("tool name must not be empty")]
    EmptyName,
    #[error("required parameter `{0}` is listed more than once")]
    DuplicateRequired(String),
    #[error("required parameter `{0}` is not declared in properties")]
    UndeclaredRequired(String),
    #[error("{0}")]
    Factory(String),
}

/// Gateway-wide error model for configuration and boot failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Message(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<anyhow::Error> for GatewayError {
    fn from(e: anyhow::Error) -> Self {
        GatewayError::Message(e.to_string())
    }
}
