//! Environment variable keys and their alias chains.
//!
//! Primary keys are `GAJCHAT_*`; aliases keep the variable names the Python
//! deployment used (`GOOGLE_API_KEY`, `OPENAI_*`) working.

/// LLM API
pub mod llm {
    pub const API_BASE: &str = "GAJCHAT_API_BASE";
    pub const API_BASE_ALIASES: &[&str] = &["OPENAI_API_BASE", "OPENAI_BASE_URL", "BASE_URL"];

    pub const API_KEY: &str = "GAJCHAT_API_KEY";
    pub const API_KEY_ALIASES: &[&str] = &["GOOGLE_API_KEY", "OPENAI_API_KEY", "API_KEY"];

    pub const MODEL: &str = "GAJCHAT_MODEL";
    pub const MODEL_ALIASES: &[&str] = &["OPENAI_MODEL", "MODEL"];

    pub const MAX_TOKENS: &str = "GAJCHAT_MAX_TOKENS";
    pub const TEMPERATURE: &str = "GAJCHAT_TEMPERATURE";
    pub const REQUEST_TIMEOUT_SECS: &str = "GAJCHAT_LLM_TIMEOUT_SECS";
}

/// Agent behaviour
pub mod agent {
    pub const MAX_ITERATIONS: &str = "GAJCHAT_MAX_ITERATIONS";
    pub const MAX_HISTORY: &str = "GAJCHAT_MAX_HISTORY";
    pub const SYSTEM_PROMPT: &str = "GAJCHAT_SYSTEM_PROMPT";
}

/// HTTP server
pub mod server {
    pub const HOST: &str = "GAJCHAT_HOST";
    pub const HOST_ALIASES: &[&str] = &["HOST"];

    pub const PORT: &str = "GAJCHAT_PORT";
    pub const PORT_ALIASES: &[&str] = &["PORT"];
}

/// Background loop / dispatcher
pub mod bridge {
    /// Per-dispatch timeout in seconds. `0` disables the timeout.
    pub const DISPATCH_TIMEOUT_SECS: &str = "GAJCHAT_DISPATCH_TIMEOUT_SECS";
    /// Bounded channel capacity between the loop and a stream consumer.
    pub const STREAM_BUFFER: &str = "GAJCHAT_STREAM_BUFFER";
}

/// Property listing API used by the search tool
pub mod property {
    pub const API_URL: &str = "GAJCHAT_PROPERTY_API_URL";
    pub const API_URL_ALIASES: &[&str] = &["PROPERTY_API_URL"];

    pub const FETCH_TIMEOUT_SECS: &str = "GAJCHAT_PROPERTY_TIMEOUT_SECS";
}

/// Logging
pub mod observability {
    pub const QUIET: &str = "GAJCHAT_QUIET";
    pub const LOG_LEVEL: &str = "GAJCHAT_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["LOG_LEVEL"];
    pub const LOG_JSON: &str = "GAJCHAT_LOG_JSON";
}
