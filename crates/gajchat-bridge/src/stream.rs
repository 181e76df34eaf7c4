//! Stream cursor: a producer task on the loop pushes items into a bounded
//! channel, the consuming thread pulls them one at a time.

use std::iter::FusedIterator;
use std::panic::AssertUnwindSafe;

use futures_util::{FutureExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::{panic_message, BridgeError};
use crate::runtime::LoopHandle;

enum Frame<T> {
    Item(T),
    Panicked(String),
    End,
}

/// Blocking iterator over a stream polled on the background loop.
///
/// Yields `Ok(item)` in production order, then `None` on exhaustion. A bridge
/// failure (panic in the stream, loop gone) is yielded once as `Err` and the
/// cursor is fused after it. Dropping the cursor early cancels the producer.
///
/// `next()` blocks, so it must run on a plain thread or inside
/// `spawn_blocking`, never directly on an async worker.
pub struct StreamCursor<T> {
    rx: mpsc::Receiver<Frame<T>>,
    abort: AbortHandle,
    done: bool,
    yielded: usize,
}

impl<T: Send + 'static> StreamCursor<T> {
    pub(crate) fn spawn<S>(handle: &LoopHandle, stream: S, capacity: usize) -> Result<Self, BridgeError>
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = handle.spawn(async move {
            let mut stream = Box::pin(stream);
            loop {
                let frame = match AssertUnwindSafe(stream.next()).catch_unwind().await {
                    Ok(Some(item)) => Frame::Item(item),
                    Ok(None) => Frame::End,
                    Err(payload) => Frame::Panicked(panic_message(payload)),
                };
                let last = !matches!(frame, Frame::Item(_));
                if tx.send(frame).await.is_err() {
                    tracing::debug!("stream consumer went away; producer exiting");
                    return;
                }
                if last {
                    return;
                }
            }
        })?;
        Ok(Self {
            rx,
            abort: task.abort_handle(),
            done: false,
            yielded: 0,
        })
    }
}

impl<T> StreamCursor<T> {
    /// Items handed to the consumer so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn is_exhausted(&self) -> bool {
        self.done
    }
}

impl<T> Iterator for StreamCursor<T> {
    type Item = Result<T, BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.rx.blocking_recv() {
            Some(Frame::Item(item)) => {
                self.yielded += 1;
                Some(Ok(item))
            }
            Some(Frame::End) => {
                self.done = true;
                None
            }
            Some(Frame::Panicked(msg)) => {
                self.done = true;
                Some(Err(BridgeError::WorkPanicked(msg)))
            }
            // Channel closed without an End frame: the producer was dropped
            // by a stopping or dead loop.
            None => {
                self.done = true;
                Some(Err(BridgeError::LoopUnavailable))
            }
        }
    }
}

impl<T> FusedIterator for StreamCursor<T> {}

impl<T> Drop for StreamCursor<T> {
    fn drop(&mut self) {
        if !self.done {
            self.abort.abort();
            tracing::debug!(yielded = self.yielded, "stream cursor dropped before exhaustion");
        }
    }
}

impl<T> std::fmt::Debug for StreamCursor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCursor")
            .field("done", &self.done)
            .field("yielded", &self.yielded)
            .finish()
    }
}
