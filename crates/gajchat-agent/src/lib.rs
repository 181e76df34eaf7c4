//! gajchat-agent: tool-calling chat agent for the 100Gaj property assistant.
//!
//! - `engine`: [`ChatEngine`] trait and the production [`ToolCallingAgent`]
//! - `chat`: request parsing and the per-request event stream
//! - `tools`: tool registry and `query_property_database`
//! - `llm`: OpenAI-compatible chat-completions client

pub mod chat;
pub mod engine;
pub mod llm;
pub mod prompt;
pub mod tools;
pub mod types;

pub use chat::{chat_events, ChatEvent, ChatRequest, ChatRequestError, HistoryMessage};
pub use engine::{AgentError, ChatEngine, ToolCallingAgent};
pub use tools::{PropertyCatalog, PropertySearchTool, ToolRegistry};
pub use types::{AgentConfig, ChatMessage};
