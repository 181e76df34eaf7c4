//! Chat engine: the async upstream that answers one question given history.
//!
//! [`ToolCallingAgent`] is the production engine. It loops over
//! `/chat/completions`, executing any tool calls the model asks for, until the
//! model answers with plain text.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient};
use crate::tools::{PropertyCatalog, PropertySearchTool, ToolRegistry};
use crate::types::{AgentConfig, ChatMessage};

/// Anything that can answer a chat turn.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    async fn achat(&self, message: &str, history: &[ChatMessage]) -> Result<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("model returned an empty answer")]
    EmptyAnswer,
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
    #[error("no final answer after {0} model calls")]
    IterationLimit(usize),
}

/// Tool-calling agent over an OpenAI-compatible endpoint.
#[derive(Debug)]
pub struct ToolCallingAgent {
    client: LlmClient,
    config: AgentConfig,
    tools: ToolRegistry,
}

impl ToolCallingAgent {
    pub fn new(config: AgentConfig, tools: ToolRegistry) -> Result<Self> {
        let client = LlmClient::new(&config.api_base, &config.api_key, config.request_timeout)?;
        Ok(Self {
            client,
            config,
            tools,
        })
    }

    /// Agent wired with the property search tool.
    pub fn property_assistant(config: AgentConfig, catalog: Arc<PropertyCatalog>) -> Result<Self> {
        let tools = ToolRegistry::new().register(PropertySearchTool::new(catalog));
        Self::new(config, tools)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// `[system, last max_history of history, user]`.
    fn build_messages(&self, message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let skip = history.len().saturating_sub(self.config.max_history);
        let mut messages = Vec::with_capacity(history.len() - skip + 2);
        messages.push(ChatMessage::system(self.config.system_prompt()));
        messages.extend(history[skip..].iter().cloned());
        messages.push(ChatMessage::user(message));
        messages
    }
}

#[async_trait]
impl ChatEngine for ToolCallingAgent {
    async fn achat(&self, message: &str, history: &[ChatMessage]) -> Result<String> {
        let mut messages = self.build_messages(message, history);
        let definitions = self.tools.definitions();
        let tools = (!definitions.is_empty()).then_some(definitions.as_slice());
        let options = CompletionOptions::from_config(&self.config);

        for iteration in 1..=self.config.max_iterations {
            let response = self
                .client
                .chat_completion(&options, &messages, tools)
                .await?;
            let choice = response
                .into_message()
                .ok_or_else(|| AgentError::MalformedResponse("no choices".to_string()))?;

            let tool_calls = choice.tool_calls.unwrap_or_default();
            if tool_calls.is_empty() {
                let answer = choice.content.unwrap_or_default();
                if answer.trim().is_empty() {
                    return Err(AgentError::EmptyAnswer.into());
                }
                tracing::debug!(iteration, chars = answer.len(), "agent answered");
                return Ok(answer);
            }

            tracing::info!(iteration, calls = tool_calls.len(), "model requested tools");
            messages.push(ChatMessage::assistant_with_tool_calls(
                choice.content.as_deref(),
                tool_calls.clone(),
            ));
            for call in &tool_calls {
                let result = self.tools.execute(call).await;
                messages.push(ChatMessage::tool_result(&call.id, &result.content));
            }
        }

        Err(AgentError::IterationLimit(self.config.max_iterations).into())
    }
}
