//! Axum server: WebSocket command channel and HTTP inspection endpoints.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
