//! Tool system: traits, registry, and dispatch.
//!
//! Tools come in two flavors. A [`Tool`] returns one value; its result
//! is only observed indirectly by the model on the next loop iteration.
//! A [`StreamTool`] produces an open-ended sequence of values that are
//! forwarded to the caller as they arrive. Both are addressed by name
//! through a [`ToolRegistry`] validated at construction.

pub mod coin;
pub mod dispatch;
mod params;
pub mod score;
pub mod search;
pub mod twitter;

pub use params::{ParamsExt, ToolParameters, ToolParams};

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::{PulseError, Result};

/// A synchronous tool: takes keyword parameters, returns one value.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    /// Execute the tool with the given parameters.
    async fn call(&self, params: ToolParams) -> Result<serde_json::Value>;
}

/// An asynchronous tool: takes keyword parameters, produces a sequence
/// of streamed values.
pub trait StreamTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    /// Start the tool; each produced item is forwarded to the caller as
    /// it becomes available.
    fn call(&self, params: ToolParams) -> BoxStream<'static, Result<String>>;
}

/// A registered callable, tagged by dispatch style.
#[derive(Clone)]
pub enum ToolKind {
    Sync(Arc<dyn Tool>),
    Stream(Arc<dyn StreamTool>),
}

impl ToolKind {
    fn name(&self) -> &str {
        match self {
            ToolKind::Sync(t) => t.name(),
            ToolKind::Stream(t) => t.name(),
        }
    }
}

/// Mapping from tool name to callable, validated at startup.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolKind>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous tool. Duplicate names are rejected.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        self.insert(ToolKind::Sync(tool))
    }

    /// Register a streaming tool. Duplicate names are rejected.
    pub fn register_stream(&mut self, tool: Arc<dyn StreamTool>) -> Result<()> {
        self.insert(ToolKind::Stream(tool))
    }

    fn insert(&mut self, kind: ToolKind) -> Result<()> {
        let name = kind.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(PulseError::Configuration(format!(
                "duplicate tool name: {name}"
            )));
        }
        self.tools.insert(name, kind);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolKind> {
        self.tools.get(name)
    }

    pub fn sync_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        match self.tools.get(name) {
            Some(ToolKind::Sync(t)) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn stream_tool(&self, name: &str) -> Option<Arc<dyn StreamTool>> {
        match self.tools.get(name) {
            Some(ToolKind::Stream(t)) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn has_stream_tools(&self) -> bool {
        self.tools
            .values()
            .any(|k| matches!(k, ToolKind::Stream(_)))
    }

    pub fn has_sync_tools(&self) -> bool {
        self.tools.values().any(|k| matches!(k, ToolKind::Sync(_)))
    }

    /// OpenAI-style function schema for every registered tool, used to
    /// seed the transcript so the model knows what it may call.
    pub fn openai_schema(&self) -> serde_json::Value {
        let mut entries: Vec<serde_json::Value> = self
            .tools
            .values()
            .map(|kind| {
                let (name, description, parameters) = match kind {
                    ToolKind::Sync(t) => (t.name(), t.description(), &t.parameters().schema),
                    ToolKind::Stream(t) => (t.name(), t.description(), &t.parameters().schema),
                };
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": name,
                        "description": description,
                        "parameters": parameters,
                    }
                })
            })
            .collect();
        entries.sort_by_key(|e| e["function"]["name"].as_str().unwrap_or_default().to_string());
        serde_json::Value::Array(entries)
    }
}

/// Type alias for the closure-tool handler.
type FnToolHandler = dyn Fn(ToolParams) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
    + Send
    + Sync;

/// Closure-based synchronous tool for quick registration.
pub struct FnTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<FnToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |params| Box::pin(handler(params))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn call(&self, params: ToolParams) -> Result<serde_json::Value> {
        (self.handler)(params).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}
