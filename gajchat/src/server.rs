//! HTTP surface: health check and the SSE chat endpoint.
//!
//! Axum handlers run on the server runtime. Each chat request gets one
//! blocking-pool thread that drains the chat stream from the background loop
//! through the [`Dispatcher`] and forwards SSE frames to the response body.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::Stream;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use gajchat_agent::chat::{chat_events, ChatEvent, ChatRequest, ChatRequestError, UNEXPECTED_ERROR_MESSAGE};
use gajchat_agent::ChatEngine;
use gajchat_bridge::Dispatcher;

/// Frames buffered between the draining thread and the response body.
const SSE_CHANNEL_CAPACITY: usize = 16;

/// Shared per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub engine: Arc<dyn ChatEngine>,
    pub max_history: usize,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/api/v1/chat", post(chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "message": "100Gaj chat API is running"}))
}

fn bad_request(err: ChatRequestError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": err.to_string()})),
    )
        .into_response()
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let parsed = serde_json::from_slice::<Value>(&body)
        .map_err(|e| {
            tracing::debug!(error = %e, "chat body is not JSON");
            ChatRequestError::MissingMessage
        })
        .and_then(|v| ChatRequest::from_json(&v));
    let request = match parsed {
        Ok(r) => r,
        Err(e) => return bad_request(e),
    };

    let (tx, rx) = mpsc::channel::<Bytes>(SSE_CHANNEL_CAPACITY);
    tokio::task::spawn_blocking(move || {
        forward_events(&state, request, &tx);
    });

    sse_response(sse_body_stream(rx))
}

/// Drain the chat stream on the calling (blocking) thread and push SSE
/// frames into `tx`. Returns when the stream ends, fails, or the client
/// disconnects; dropping the cursor cancels the producer on the loop.
fn forward_events(state: &AppState, request: ChatRequest, tx: &mpsc::Sender<Bytes>) {
    let events = chat_events(state.engine.clone(), request, state.max_history);
    let cursor = match state.dispatcher.drain(events) {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::error!(error = %e, "failed to dispatch chat request");
            let _ = tx.blocking_send(apology_frame());
            return;
        }
    };

    for item in cursor {
        match item {
            Ok(event) => {
                if tx.blocking_send(Bytes::from(event.to_sse_frame())).is_err() {
                    tracing::debug!("client went away; abandoning chat stream");
                    return;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat stream failed mid-response");
                let _ = tx.blocking_send(apology_frame());
                return;
            }
        }
    }
}

fn apology_frame() -> Bytes {
    Bytes::from(ChatEvent::text(UNEXPECTED_ERROR_MESSAGE).to_sse_frame())
}

pub fn sse_body_stream(
    mut rx: mpsc::Receiver<Bytes>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok::<Bytes, Infallible>(chunk);
        }
    }
}

pub fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    (headers, Body::from_stream(stream)).into_response()
}

/// Resolves on Ctrl-C or SIGTERM.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Bind and serve until a shutdown signal arrives.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "100Gaj chat API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
