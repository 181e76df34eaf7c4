//! gajchat bridge: lets synchronous request threads run async work.
//!
//! - [`BackgroundLoop`]: owns the one dedicated loop thread (start / stop).
//! - [`Dispatcher`]: blocking `run` / `submit` of futures onto the loop.
//! - [`StreamCursor`]: blocking iterator over a stream polled on the loop.
//!
//! ```ignore
//! let bg = BackgroundLoop::start("gajchat-loop")?;
//! let dispatcher = Dispatcher::new(bg.handle());
//! let answer = dispatcher.run(async { engine.achat("hi", &[]).await })??;
//! for item in dispatcher.drain(events)? { /* ... */ }
//! bg.stop();
//! ```

mod dispatch;
mod error;
mod runtime;
mod stream;

#[cfg(test)]
mod tests;

pub use dispatch::{Dispatcher, PendingResult};
pub use error::BridgeError;
pub use runtime::{BackgroundLoop, LoopHandle};
pub use stream::StreamCursor;
