//! The background loop: one current-thread tokio runtime on a dedicated
//! OS thread.
//!
//! Request threads never own a runtime. They hand futures to this loop through
//! [`crate::Dispatcher`] and block on the result. The loop thread is a plain
//! `std::thread`, so it never keeps the process alive on its own: returning
//! from `main` exits even if `stop()` was never called.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{JoinHandle, ThreadId};

use tokio::sync::oneshot;

use crate::error::BridgeError;

#[derive(Debug, Default)]
struct LoopState {
    running: AtomicBool,
    thread_id: OnceLock<ThreadId>,
}

/// Clears `running` when the loop thread exits, including on panic unwind.
struct RunningGuard<'a>(&'a LoopState);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Cheap, cloneable reference to a running loop.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    runtime: tokio::runtime::Handle,
    state: Arc<LoopState>,
}

impl LoopHandle {
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// True when called from the loop thread itself.
    pub fn is_loop_thread(&self) -> bool {
        self.state.thread_id.get() == Some(&std::thread::current().id())
    }

    /// Spawn onto the loop. Fails fast when the loop is gone so callers never
    /// wait on a dead thread.
    pub(crate) fn spawn<F>(&self, fut: F) -> Result<tokio::task::JoinHandle<F::Output>, BridgeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_loop_thread() {
            return Err(BridgeError::CalledFromLoop);
        }
        if !self.is_running() {
            return Err(BridgeError::LoopUnavailable);
        }
        // If the loop shuts down between the check and here, tokio drops the
        // task immediately and the waiter sees a closed channel.
        Ok(self.runtime.spawn(fut))
    }
}

/// Owner of the loop thread. Exactly one per process, created by the
/// composition root and stopped at shutdown (or on drop).
#[derive(Debug)]
pub struct BackgroundLoop {
    handle: LoopHandle,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundLoop {
    /// Start the loop on a new thread named `name`. Returns once the loop is
    /// accepting work.
    pub fn start(name: &str) -> Result<Self, BridgeError> {
        let state = Arc::new(LoopState::default());
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread_state = Arc::clone(&state);
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = thread_state.thread_id.set(std::thread::current().id());
                thread_state.running.store(true, Ordering::SeqCst);
                let _running = RunningGuard(&thread_state);

                if ready_tx.send(Ok(runtime.handle().clone())).is_err() {
                    return;
                }
                tracing::debug!("background loop running");
                runtime.block_on(async {
                    // Sender dropped counts as a stop request too.
                    let _ = shutdown_rx.await;
                });
                // `_running` drops before `runtime`: the flag is cleared before
                // outstanding tasks are dropped and their waiters woken.
                tracing::debug!("background loop exiting, abandoning outstanding work");
            })
            .map_err(BridgeError::Spawn)?;

        let runtime = match ready_rx.recv() {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(BridgeError::Spawn(e));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(BridgeError::LoopUnavailable);
            }
        };

        tracing::info!(thread = name, "Background loop started");
        Ok(Self {
            handle: LoopHandle { runtime, state },
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Signal the loop to exit and join its thread. Work that has not resolved
    /// is dropped, never retried. Only the first call does anything.
    pub fn stop(&self) {
        let tx = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(tx) = tx else {
            return;
        };
        let _ = tx.send(());

        if self.handle.is_loop_thread() {
            // Joining ourselves would deadlock; the loop exits after the
            // current task yields.
            tracing::warn!("stop() called from the background loop thread; not joining");
            return;
        }

        let thread = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("background loop thread panicked");
            }
        }
        tracing::info!("Background loop stopped");
    }
}

impl Drop for BackgroundLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
