//! Cross-thread dispatch: submit a future to the background loop from any
//! non-loop thread and block until it resolves.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use futures_util::{FutureExt, Stream};
use tokio::task::AbortHandle;

use crate::error::{panic_message, BridgeError};
use crate::runtime::LoopHandle;
use crate::stream::StreamCursor;

/// Entry point for synchronous callers. Clone freely; every clone targets
/// the same loop.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handle: LoopHandle,
    default_timeout: Option<Duration>,
    stream_buffer: usize,
}

impl Dispatcher {
    pub fn new(handle: LoopHandle) -> Self {
        Self {
            handle,
            default_timeout: None,
            stream_buffer: 1,
        }
    }

    /// Timeout applied by [`Dispatcher::run`]. `None` waits indefinitely.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Capacity of the loop → consumer channel used by [`Dispatcher::drain`].
    #[must_use]
    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }

    pub fn is_available(&self) -> bool {
        self.handle.is_running()
    }

    /// Schedule `work` and return a handle to its pending result.
    pub fn submit<F>(&self, work: F) -> Result<PendingResult<F::Output>, BridgeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let task = self.handle.spawn(async move {
            let outcome = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .map_err(panic_message);
            // Receiver gone means the caller gave up; nothing to report.
            let _ = tx.send(outcome);
        })?;
        Ok(PendingResult {
            rx,
            abort: task.abort_handle(),
        })
    }

    /// Run `work` to completion, honouring the default timeout.
    pub fn run<F>(&self, work: F) -> Result<F::Output, BridgeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let pending = self.submit(work)?;
        match self.default_timeout {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        }
    }

    /// Run `work` with an explicit timeout. On timeout the work is cancelled.
    pub fn run_timeout<F>(&self, work: F, timeout: Duration) -> Result<F::Output, BridgeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.submit(work)?.wait_timeout(timeout)
    }

    /// Expose an async stream as a blocking iterator. The stream is polled on
    /// the loop; items cross over through a bounded channel.
    pub fn drain<S>(&self, stream: S) -> Result<StreamCursor<S::Item>, BridgeError>
    where
        S: Stream + Send + 'static,
        S::Item: Send + 'static,
    {
        StreamCursor::spawn(&self.handle, stream, self.stream_buffer)
    }
}

/// An in-flight dispatch, owned by the thread that submitted it.
///
/// Resolves exactly once. Dropping it without waiting abandons the dispatch
/// and cancels the work at its next await point.
#[derive(Debug)]
#[must_use = "dropping a PendingResult cancels the work"]
pub struct PendingResult<T> {
    rx: Receiver<Result<T, String>>,
    abort: AbortHandle,
}

impl<T> PendingResult<T> {
    /// Block until the work resolves.
    pub fn wait(self) -> Result<T, BridgeError> {
        match self.rx.recv() {
            Ok(outcome) => outcome.map_err(BridgeError::WorkPanicked),
            Err(_) => Err(BridgeError::LoopUnavailable),
        }
    }

    /// Block for at most `timeout`. On expiry the work is cancelled and the
    /// caller gets [`BridgeError::Timeout`].
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, BridgeError> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome.map_err(BridgeError::WorkPanicked),
            Err(RecvTimeoutError::Timeout) => {
                self.abort.abort();
                tracing::warn!(?timeout, "dispatch timed out; work cancelled");
                Err(BridgeError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::LoopUnavailable),
        }
    }

    /// Abandon the dispatch and cancel the work.
    pub fn cancel(self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl<T> Drop for PendingResult<T> {
    fn drop(&mut self) {
        // No-op once the task has completed.
        self.abort.abort();
    }
}
