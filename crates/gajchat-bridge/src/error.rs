use std::time::Duration;

use thiserror::Error;

/// Failures of the bridge itself. Errors produced by the work are not
/// wrapped here; fallible work returns its own `Result` as the output.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The loop was stopped, or its thread died, before the work resolved.
    #[error("background loop is not running")]
    LoopUnavailable,

    /// The caller stopped waiting. The work has been cancelled.
    #[error("dispatch timed out after {0:?}")]
    Timeout(Duration),

    #[error("work panicked on the background loop: {0}")]
    WorkPanicked(String),

    /// Blocking on the loop from the loop thread would deadlock it.
    #[error("cannot block on the background loop from its own thread")]
    CalledFromLoop,

    #[error("failed to start background loop: {0}")]
    Spawn(#[source] std::io::Error),
}

pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
