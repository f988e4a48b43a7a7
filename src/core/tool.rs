use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::core::error::{ToolError, ToolLoadError};
use crate::core::mcp::JsonObject;

/// JSON-Schema-like description of the arguments a tool accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: JsonObject,
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn object() -> Self {
        Self { kind: "object".into(), properties: JsonObject::new(), required: Vec::new() }
    }

    pub fn property(mut self, name: impl Into<String>, schema: JsonValue) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), ToolLoadError> {
        for (i, key) in self.required.iter().enumerate() {
            if self.required[..i].contains(key) {
                return Err(ToolLoadError::DuplicateRequired(key.clone()));
            }
            if !self.properties.contains_key(key) {
                return Err(ToolLoadError::UndeclaredRequired(key.clone()));
            }
        }
        Ok(())
    }

    /// First required key absent from `args`, in declaration order.
    pub fn first_missing(&self, args: &JsonObject) -> Option<&str> {
        self.required.iter().map(String::as_str).find(|k| !args.contains_key(*k))
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_else(|_| JsonValue::Object(JsonObject::new()))
    }
}

/// The callable half of a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, args: JsonObject) -> Result<JsonValue, ToolError>;
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<JsonValue, ToolError>> + Send>>;

/// Adapts a plain async closure into a [`ToolHandler`].
pub struct FnTool {
    inner: Arc<dyn Fn(JsonObject) -> ToolFuture + Send + Sync>,
}

impl FnTool {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonValue, ToolError>> + Send + 'static,
    {
        Self { inner: Arc::new(move |args| Box::pin(f(args))) }
    }
}

#[async_trait]
impl ToolHandler for FnTool {
    async fn invoke(&self, args: JsonObject) -> Result<JsonValue, ToolError> {
        (self.inner)(args).await
    }
}

/// A named, schema-described capability. Immutable once built.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameter_schema: ParameterSchema,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: ParameterSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, ToolLoadError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ToolLoadError::EmptyName);
        }
        parameter_schema.validate()?;
        Ok(Self { name, description: description.into(), parameter_schema, handler })
    }

    pub async fn invoke(&self, args: JsonObject) -> Result<JsonValue, ToolError> {
        self.handler.invoke(args).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameter_schema", &self.parameter_schema)
            .finish_non_exhaustive()
    }
}
