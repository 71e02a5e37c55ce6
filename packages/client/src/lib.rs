//! Focusbell CLI client: sends commands over WebSocket and renders server messages.

pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;
pub mod ui;

pub use runner::run_client;
pub use session::ConnectOptions;
