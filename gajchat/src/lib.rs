//! gajchat: 100Gaj property chat API.
//!
//! The binary wires [`app::App`] (background loop + agent) to either the
//! axum server in [`server`] or a one-shot terminal question.

pub mod app;
pub mod cli;
pub mod server;

pub use server::{router, AppState};
