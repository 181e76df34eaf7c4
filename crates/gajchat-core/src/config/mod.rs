//! Unified config layer.
//!
//! Every env read lives here; the rest of the workspace consumes typed
//! structs instead of calling `std::env::var`.
//!
//! - `loader`: `.env` loading and the `env_or` / `env_optional` / `env_bool` helpers
//! - `schema`: `LlmConfig`, `ServerConfig`, `BridgeConfig`, ...
//! - `env_keys`: key constants and alias chains

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv, load_dotenv_from_dir, set_env_var};
pub use schema::{
    AgentSettings, BridgeConfig, ConfigError, LlmConfig, ObservabilityConfig, PropertyApiConfig,
    ServerConfig,
};
