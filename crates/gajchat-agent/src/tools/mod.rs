//! Tool registry: definitions sent to the model plus async dispatch by name.
//!
//! Pattern: `ToolRegistry::new().register(PropertySearchTool::new(catalog))`.
//! Execution failures never escape the registry; they come back as error
//! [`ToolResult`]s so the model can see them and recover.

pub mod property_search;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{safe_truncate, ToolCall, ToolDefinition, ToolResult};

pub use property_search::{PropertyCatalog, PropertyQuery, PropertySearchTool};

/// A callable tool exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Run with already-parsed JSON arguments (always an object).
    async fn call(&self, args: &Value) -> anyhow::Result<String>;
}

/// Registered tools, keyed by function name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A later tool with the same name shadows an earlier one.
    #[must_use]
    pub fn register(mut self, tool: impl Tool + 'static) -> Self {
        let name = tool.definition().function.name;
        self.tools.retain(|t| t.definition().function.name != name);
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|t| t.definition().function.name)
            .collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.definition().function.name == name)
    }

    /// Execute one tool call requested by the model.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let tool_name = call.function.name.as_str();
        let error = |content: String| ToolResult {
            tool_call_id: call.id.clone(),
            tool_name: tool_name.to_string(),
            content,
            is_error: true,
        };

        let Some(tool) = self.find(tool_name) else {
            tracing::warn!(tool = tool_name, "model requested unknown tool");
            return error(format!("Unknown tool: {}", tool_name));
        };

        let args = match parse_arguments(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = tool_name, error = %e, "invalid tool arguments");
                return error(format!("Invalid arguments for {}: {}", tool_name, e));
            }
        };

        tracing::info!(tool = tool_name, args = %args, "calling tool");
        match tool.call(&args).await {
            Ok(content) => {
                tracing::debug!(
                    tool = tool_name,
                    output = safe_truncate(&content, 200),
                    "tool finished"
                );
                ToolResult {
                    tool_call_id: call.id.clone(),
                    tool_name: tool_name.to_string(),
                    content,
                    is_error: false,
                }
            }
            Err(e) => {
                tracing::error!(tool = tool_name, error = ?e, "tool failed");
                error(format!("Error: {}", e))
            }
        }
    }
}

/// Providers send an empty string when a function takes no arguments.
fn parse_arguments(raw: &str) -> anyhow::Result<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_str::<Value>(raw)? {
        Value::Null => Ok(Value::Object(Default::default())),
        v @ Value::Object(_) => Ok(v),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}
