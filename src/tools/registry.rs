//! Tool discovery with a time-based cache.
//!
//! A discovery pass walks a fixed list of [`ToolSource`]s and builds an immutable
//! [`ToolSnapshot`]. Readers always get a whole snapshot behind an `Arc`; a rebuild swaps the
//! pointer under the write lock, so nobody ever observes a half-built list.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::core::content::ToolContent;
use crate::core::error::{ToolError, ToolLoadError};
use crate::core::mcp::JsonObject;
use crate::core::tool::ToolDescriptor;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

type LoadFn = dyn Fn() -> Result<ToolDescriptor, ToolLoadError> + Send + Sync;

/// One statically known place a tool descriptor comes from.
#[derive(Clone)]
pub struct ToolSource {
    name: String,
    load: Arc<LoadFn>,
}

impl ToolSource {
    pub fn new<F>(name: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> Result<ToolDescriptor, ToolLoadError> + Send + Sync + 'static,
    {
        Self { name: name.into(), load: Arc::new(load) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSource").field("name", &self.name).finish_non_exhaustive()
    }
}

/// `tools/list` entry: the descriptor without its handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
}

pub fn to_mcp_shape(entries: &[Arc<ToolDescriptor>]) -> Vec<McpTool> {
    entries
        .iter()
        .map(|t| McpTool {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.parameter_schema.to_json(),
        })
        .collect()
}

/// Result of one discovery pass. The MCP projection is computed once per snapshot.
#[derive(Debug)]
pub struct ToolSnapshot {
    entries: Vec<Arc<ToolDescriptor>>,
    mcp: Vec<McpTool>,
    built_at: Instant,
}

impl ToolSnapshot {
    fn new(entries: Vec<Arc<ToolDescriptor>>) -> Self {
        let mcp = to_mcp_shape(&entries);
        Self { entries, mcp, built_at: Instant::now() }
    }

    pub fn mcp_tools(&self) -> &[McpTool] {
        &self.mcp
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.entries.iter().find(|t| t.name == name)
    }

    /// Look up `name`, check required parameters, then invoke.
    pub async fn execute(&self, name: &str, args: JsonObject) -> Result<ToolContent, ToolError> {
        let tool = self.find(name).ok_or_else(|| ToolError::NotFound(name.to_owned()))?;
        if let Some(key) = tool.parameter_schema.first_missing(&args) {
            return Err(ToolError::MissingParameter(key.to_owned()));
        }
        let value = tool.invoke(args).await?;
        Ok(ToolContent::from(value))
    }
}

pub struct ToolRegistry {
    sources: Vec<ToolSource>,
    ttl: Duration,
    cache: RwLock<Option<Arc<ToolSnapshot>>>,
    discoveries: AtomicU64,
}

impl ToolRegistry {
    pub fn new(sources: Vec<ToolSource>, ttl: Duration) -> Self {
        Self { sources, ttl, cache: RwLock::new(None), discoveries: AtomicU64::new(0) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of full discovery passes performed so far.
    pub fn discovery_count(&self) -> u64 {
        self.discoveries.load(Ordering::Relaxed)
    }

    fn is_fresh(&self, snapshot: &ToolSnapshot) -> bool {
        snapshot.built_at.elapsed() < self.ttl
    }

    /// Cached snapshot while younger than the TTL; otherwise (or when forced) a fresh pass.
    pub async fn discover(&self, force_refresh: bool) -> Arc<ToolSnapshot> {
        if !force_refresh {
            if let Some(snapshot) = self.cache.read().await.as_ref().filter(|s| self.is_fresh(s)) {
                return snapshot.clone();
            }
        }

        let mut guard = self.cache.write().await;
        // Another caller may have rebuilt while we waited for the lock.
        if !force_refresh {
            if let Some(snapshot) = guard.as_ref().filter(|s| self.is_fresh(s)) {
                return snapshot.clone();
            }
        }
        let snapshot = Arc::new(self.build());
        *guard = Some(snapshot.clone());
        snapshot
    }

    fn build(&self) -> ToolSnapshot {
        self.discoveries.fetch_add(1, Ordering::Relaxed);
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match (source.load)() {
                Ok(tool) if !seen.insert(tool.name.clone()) => {
                    tracing::warn!(source = source.name(), tool = %tool.name, "duplicate tool name; skipping");
                }
                Ok(tool) => entries.push(Arc::new(tool)),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "tool source failed to load; skipping");
                }
            }
        }
        tracing::info!(tools = entries.len(), sources = self.sources.len(), "tool discovery complete");
        ToolSnapshot::new(entries)
    }
}
