use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use gajchat::app::App;
use gajchat::cli::{Cli, Commands};
use gajchat::server;
use gajchat_agent::chat::{chat_events, ChatEvent, ChatRequest};
use gajchat_core::config::ServerConfig;
use gajchat_core::observability::{init_tracing, TracingMode};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = match cli.command {
        Commands::Serve { .. } => TracingMode::Server,
        Commands::Ask { .. } => TracingMode::Cli,
    };
    init_tracing(mode);

    let app = App::start()?;
    let result = match cli.command {
        Commands::Serve { host, port } => run_server(&app, host, port),
        Commands::Ask {
            message,
            history,
            sse,
        } => run_ask(&app, message, history, sse),
    };
    app.shutdown();
    result
}

/// HTTP runs on its own multi-thread runtime, apart from the background loop.
fn run_server(app: &App, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    let addr = config.socket_addr()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gajchat-http")
        .build()
        .context("Failed to create HTTP runtime")?;
    rt.block_on(server::serve(app.state.clone(), addr))
}

fn run_ask(app: &App, message: String, history: Option<String>, sse: bool) -> Result<()> {
    let history: Value = match history {
        Some(raw) => serde_json::from_str(&raw).context("--history is not valid JSON")?,
        None => Value::Array(Vec::new()),
    };
    let request = ChatRequest::from_json(&serde_json::json!({
        "message": message,
        "history": history,
    }))?;

    let state = &app.state;
    let events = chat_events(state.engine.clone(), request, state.max_history);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in state.dispatcher.drain(events)? {
        let event = event?;
        if sse {
            write!(out, "{}", event.to_sse_frame())?;
        } else if let ChatEvent::Text { data } = &event {
            writeln!(out, "{}", data)?;
        }
        out.flush()?;
    }
    Ok(())
}
