//! Chat turn as a stream of events.
//!
//! One request produces either `Text` followed by `End` on success, or a
//! single apology `Text` (and no `End`) when anything goes wrong upstream.
//! Upstream failures are logged here and never reach the consumer as errors.

use std::sync::Arc;

use futures_util::Stream;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::{AgentError, ChatEngine};
use crate::types::ChatMessage;

pub const EMPTY_ANSWER_MESSAGE: &str = "I apologize, but I've encountered an error.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "I'm sorry, an unexpected error occurred.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatRequestError {
    #[error("Message not provided")]
    MissingMessage,
}

/// Prior conversation entry as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryMessage>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, history: Vec<HistoryMessage>) -> Self {
        Self {
            message: message.into(),
            history,
        }
    }

    /// `message` must be a string; malformed history entries are dropped.
    pub fn from_json(body: &Value) -> Result<Self, ChatRequestError> {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .ok_or(ChatRequestError::MissingMessage)?;

        let history = match body.get("history") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match HistoryMessage::deserialize(item) {
                    Ok(m) => Some(m),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed history entry");
                        None
                    }
                })
                .collect(),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                tracing::warn!(kind = json_kind(other), "ignoring non-array history");
                Vec::new()
            }
        };

        Ok(Self::new(message, history))
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `"user"` stays user; every other role is treated as the assistant.
/// Only the most recent `max` entries are kept.
pub fn history_to_messages(history: &[HistoryMessage], max: usize) -> Vec<ChatMessage> {
    let skip = history.len().saturating_sub(max);
    history[skip..]
        .iter()
        .map(|m| {
            if m.role == "user" {
                ChatMessage::user(&m.content)
            } else {
                ChatMessage::assistant(&m.content)
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Text { data: String },
    End,
}

impl ChatEvent {
    pub fn text(data: impl Into<String>) -> Self {
        Self::Text { data: data.into() }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text { data } => json!({"type": "text", "data": data}),
            Self::End => json!({"type": "end"}),
        }
    }

    /// `data: {json}\n\n`, with `type` always the first key.
    pub fn to_sse_frame(&self) -> String {
        match self {
            Self::Text { data } => format!(
                "data: {{\"type\":\"text\",\"data\":{}}}\n\n",
                Value::String(data.clone())
            ),
            Self::End => "data: {\"type\":\"end\"}\n\n".to_string(),
        }
    }
}

/// Answer one request through `engine`, as events.
pub fn chat_events(
    engine: Arc<dyn ChatEngine>,
    request: ChatRequest,
    max_history: usize,
) -> impl Stream<Item = ChatEvent> + Send + 'static {
    async_stream::stream! {
        let history = history_to_messages(&request.history, max_history);
        match engine.achat(&request.message, &history).await {
            Ok(answer) => {
                yield ChatEvent::text(answer);
                yield ChatEvent::End;
            }
            Err(e) if matches!(e.downcast_ref::<AgentError>(), Some(AgentError::EmptyAnswer)) => {
                tracing::error!(error = ?e, "chat engine returned no answer");
                yield ChatEvent::text(EMPTY_ANSWER_MESSAGE);
            }
            Err(e) => {
                tracing::error!(error = ?e, "unexpected error in chat stream");
                yield ChatEvent::text(UNEXPECTED_ERROR_MESSAGE);
            }
        }
    }
}
