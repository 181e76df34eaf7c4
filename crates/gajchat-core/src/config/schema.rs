//! Config structs grouped by concern, all loaded from env with shared fallbacks.

use std::net::SocketAddr;
use std::time::Duration;

use super::env_keys::{agent, bridge, llm, observability as obv, property, server};
use super::loader::{env_bool, env_f64, env_optional, env_or, env_u64, load_dotenv};

/// Gemini's OpenAI-compatible endpoint; the service ran on Gemini Flash.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_PROPERTY_API_URL: &str = "https://100gaj.vercel.app/api/properties";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address '{addr}': {source}")]
    InvalidListenAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// LLM API settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u64,
    pub temperature: Option<f64>,
    pub request_timeout: Duration,
}

impl LlmConfig {
    /// Load from env (reads `.env` first). Empty values use defaults.
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            api_base: env_or(llm::API_BASE, llm::API_BASE_ALIASES, || {
                DEFAULT_API_BASE.to_string()
            }),
            api_key: env_or(llm::API_KEY, llm::API_KEY_ALIASES, String::new),
            model: env_or(llm::MODEL, llm::MODEL_ALIASES, || DEFAULT_MODEL.to_string()),
            max_tokens: env_u64(llm::MAX_TOKENS, &[], 2048),
            temperature: env_f64(llm::TEMPERATURE, &[]),
            request_timeout: Duration::from_secs(env_u64(llm::REQUEST_TIMEOUT_SECS, &[], 120)),
        }
    }

    /// Fails when no API key is configured.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            Err(ConfigError::Missing("GAJCHAT_API_KEY (or GOOGLE_API_KEY)"))
        } else {
            Ok(())
        }
    }
}

/// Agent loop limits.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub max_history: usize,
    pub system_prompt: Option<String>,
}

impl AgentSettings {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            max_iterations: env_u64(agent::MAX_ITERATIONS, &[], 8) as usize,
            max_history: env_u64(agent::MAX_HISTORY, &[], 20) as usize,
            system_prompt: env_optional(agent::SYSTEM_PROMPT, &[]),
        }
    }
}

/// HTTP listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        let port = env_u64(server::PORT, server::PORT_ALIASES, 8000);
        Self {
            host: env_or(server::HOST, server::HOST_ALIASES, || "0.0.0.0".to_string()),
            port: u16::try_from(port).unwrap_or(8000),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|source| ConfigError::InvalidListenAddr { addr, source })
    }
}

/// Background loop tuning.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// `None` means dispatches wait indefinitely.
    pub dispatch_timeout: Option<Duration>,
    pub stream_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: Some(Duration::from_secs(180)),
            stream_buffer: 1,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        let defaults = Self::default();
        let timeout_secs = env_u64(
            bridge::DISPATCH_TIMEOUT_SECS,
            &[],
            defaults.dispatch_timeout.map(|d| d.as_secs()).unwrap_or(0),
        );
        Self {
            dispatch_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            stream_buffer: env_u64(bridge::STREAM_BUFFER, &[], defaults.stream_buffer as u64)
                .max(1) as usize,
        }
    }
}

/// Property listing API.
#[derive(Debug, Clone)]
pub struct PropertyApiConfig {
    pub api_url: String,
    pub fetch_timeout: Duration,
}

impl PropertyApiConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            api_url: env_or(property::API_URL, property::API_URL_ALIASES, || {
                DEFAULT_PROPERTY_API_URL.to_string()
            }),
            fetch_timeout: Duration::from_secs(env_u64(property::FETCH_TIMEOUT_SECS, &[], 30)),
        }
    }
}

/// Logging: quiet, level filter, JSON output.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            quiet: env_bool(obv::QUIET, &[], false),
            log_level: env_or(obv::LOG_LEVEL, obv::LOG_LEVEL_ALIASES, || {
                "gajchat=info,tower_http=info".to_string()
            }),
            log_json: env_bool(obv::LOG_JSON, &[], false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_parses_host_port() {
        let cfg = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };
        assert_eq!(cfg.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_socket_addr_rejects_hostname() {
        let cfg = ServerConfig {
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(matches!(
            cfg.socket_addr(),
            Err(ConfigError::InvalidListenAddr { .. })
        ));
    }

    #[test]
    fn test_require_api_key() {
        let mut cfg = LlmConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: " ".to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 16,
            temperature: None,
            request_timeout: Duration::from_secs(1),
        };
        assert!(cfg.require_api_key().is_err());
        cfg.api_key = "k".to_string();
        assert!(cfg.require_api_key().is_ok());
    }

    #[test]
    fn test_bridge_defaults_are_one_at_a_time() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.stream_buffer, 1);
        assert!(cfg.dispatch_timeout.is_some());
    }
}
