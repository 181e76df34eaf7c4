//! Shared types for the agent crate.

use serde::{Deserialize, Serialize};

use gajchat_core::config::{AgentSettings, LlmConfig};

/// Truncate a string at a safe UTF-8 char boundary.
/// Returns at most `max_bytes` bytes, never splitting a multi-byte character.
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// OpenAI-compatible API base URL
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Maximum model round-trips per question (tool calls included)
    pub max_iterations: usize,
    /// Most recent history entries forwarded to the model
    pub max_history: usize,
    /// System prompt override
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: u64,
    pub request_timeout: std::time::Duration,
}

impl AgentConfig {
    /// Load from env (and `.env`): GAJCHAT_* with fallback to GOOGLE_/OPENAI_ keys.
    pub fn from_env() -> Self {
        Self::from_parts(LlmConfig::from_env(), AgentSettings::from_env())
    }

    pub fn from_parts(llm: LlmConfig, settings: AgentSettings) -> Self {
        Self {
            api_base: llm.api_base,
            api_key: llm.api_key,
            model: llm.model,
            max_iterations: settings.max_iterations.max(1),
            max_history: settings.max_history,
            system_prompt: settings.system_prompt,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            request_timeout: llm.request_timeout,
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompt::PROPERTY_ASSISTANT_PROMPT)
    }
}

// ─── OpenAI-compatible chat types ───────────────────────────────────────────

/// A chat message in OpenAI format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: &str, content: Option<&str>) -> Self {
        Self {
            role: role.to_string(),
            content: content.map(|s| s.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: &str) -> Self {
        Self::with_role("system", Some(content))
    }

    pub fn user(content: &str) -> Self {
        Self::with_role("user", Some(content))
    }

    pub fn assistant(content: &str) -> Self {
        Self::with_role("assistant", Some(content))
    }

    pub fn assistant_with_tool_calls(content: Option<&str>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::with_role("assistant", content)
        }
    }

    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::with_role("tool", Some(content))
        }
    }
}

/// A tool call from the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

/// Function call details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// OpenAI-compatible tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Function definition within a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Result from executing a tool.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: String,
    pub is_error: bool,
}
