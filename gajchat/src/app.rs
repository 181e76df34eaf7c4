//! Process wiring: config, background loop, catalog warm-up and the engine.

use std::sync::Arc;

use anyhow::{Context, Result};

use gajchat_agent::{AgentConfig, ChatEngine, PropertyCatalog, ToolCallingAgent};
use gajchat_bridge::{BackgroundLoop, Dispatcher};
use gajchat_core::config::{AgentSettings, BridgeConfig, LlmConfig, PropertyApiConfig};

use crate::server::AppState;

pub const LOOP_THREAD_NAME: &str = "gajchat-loop";

/// Everything a running process owns. Call [`App::shutdown`] once on exit.
pub struct App {
    background: BackgroundLoop,
    pub state: AppState,
}

impl App {
    /// Load config from env, start the loop, and warm the property catalog.
    pub fn start() -> Result<Self> {
        let llm = LlmConfig::from_env();
        llm.require_api_key()?;
        let bridge = BridgeConfig::from_env();
        let property = PropertyApiConfig::from_env();
        let config = AgentConfig::from_parts(llm, AgentSettings::from_env());

        let background =
            BackgroundLoop::start(LOOP_THREAD_NAME).context("Failed to start background loop")?;
        let dispatcher = Dispatcher::new(background.handle())
            .with_default_timeout(bridge.dispatch_timeout)
            .with_stream_buffer(bridge.stream_buffer);

        let catalog = Arc::new(PropertyCatalog::from_config(&property)?);
        warm_catalog(&dispatcher, catalog.clone());

        tracing::info!(
            model = %config.model,
            api_base = %config.api_base,
            max_history = config.max_history,
            "chat engine ready"
        );
        let max_history = config.max_history;
        let engine: Arc<dyn ChatEngine> =
            Arc::new(ToolCallingAgent::property_assistant(config, catalog)?);

        Ok(Self {
            background,
            state: AppState {
                dispatcher,
                engine,
                max_history,
            },
        })
    }

    pub fn shutdown(self) {
        tracing::info!("stopping background loop");
        self.background.stop();
    }
}

/// A failed warm-up is not fatal: the catalog retries on first search.
fn warm_catalog(dispatcher: &Dispatcher, catalog: Arc<PropertyCatalog>) {
    match dispatcher.run(async move { catalog.warm().await }) {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!(error = ?e, "property catalog warm-up failed"),
        Err(e) => tracing::warn!(error = %e, "property catalog warm-up not dispatched"),
    }
}
