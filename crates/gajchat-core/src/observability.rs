//! Tracing init.
//!
//! Reads `ObservabilityConfig` (GAJCHAT_QUIET, GAJCHAT_LOG_LEVEL, GAJCHAT_LOG_JSON).
//! `RUST_LOG` wins over both when set.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

/// Tracing initialization mode.
#[derive(Clone, Copy, Debug)]
pub enum TracingMode {
    /// Long-running server: configured level, request traces included.
    Server,
    /// One-shot CLI: keep stdout clean for events, only warnings on stderr.
    Cli,
}

/// Build the filter directive for a mode.
pub fn filter_directive(cfg: &ObservabilityConfig, mode: TracingMode) -> String {
    if cfg.quiet {
        return "gajchat=warn".to_string();
    }
    match mode {
        TracingMode::Server => cfg.log_level.clone(),
        TracingMode::Cli => format!("{},tower_http=warn,gajchat_bridge=warn", cfg.log_level),
    }
}

/// Initialize the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(mode: TracingMode) {
    let cfg = ObservabilityConfig::from_env();
    let level = filter_directive(&cfg, mode);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}
