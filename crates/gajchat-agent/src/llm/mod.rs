//! LLM HTTP client for chat completions with tool calling.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (Gemini's
//! OpenAI layer, OpenAI, DeepSeek, a local Ollama, ...).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{AgentConfig, ChatMessage, ToolCall, ToolDefinition};

mod openai;


/// Per-request knobs forwarded to the provider.
#[derive(Debug, Clone)]
pub struct CompletionOptions<'a> {
    pub model: &'a str,
    pub temperature: Option<f64>,
    pub max_tokens: u64,
}

impl<'a> CompletionOptions<'a> {
    pub fn from_config(config: &'a AgentConfig) -> Self {
        Self {
            model: &config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// OpenAI-compatible LLM client.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_base: &str, api_key: &str, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build LLM HTTP client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Non-streaming chat completion call.
    pub async fn chat_completion(
        &self,
        options: &CompletionOptions<'_>,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatCompletionResponse> {
        self.openai_chat_completion(options, messages, tools).await
    }
}

// ─── Response types ─────────────────────────────────────────────────────────
// Providers differ in which bookkeeping fields they send; only `choices` is
// required.

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// First choice's message, if the provider sent one.
    pub fn into_message(self) -> Option<ChoiceMessage> {
        self.choices.into_iter().next().map(|c| c.message)
    }
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}
