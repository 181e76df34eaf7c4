//! OpenAI-compatible API implementation.

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::types::{ChatMessage, ToolDefinition};

use super::{ChatCompletionResponse, CompletionOptions, LlmClient};

/// Request body for `/chat/completions`.
pub(super) fn build_request_body(
    options: &CompletionOptions<'_>,
    messages: &[ChatMessage],
    tools: Option<&[ToolDefinition]>,
) -> Result<Value> {
    let mut body = json!({
        "model": options.model,
        "max_tokens": options.max_tokens,
        "messages": messages,
    });

    if let Some(temp) = options.temperature {
        body["temperature"] = json!(temp);
    }

    if let Some(tools) = tools {
        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools)?;
        }
    }
    Ok(body)
}

impl LlmClient {
    pub(super) async fn openai_chat_completion(
        &self,
        options: &CompletionOptions<'_>,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = build_request_body(options, messages, tools)?;

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("LLM API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error ({}): {}", status, body_text);
        }

        let response: ChatCompletionResponse = resp
            .json()
            .await
            .context("Failed to parse LLM API response")?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM completion"
            );
        }
        Ok(response)
    }
}
