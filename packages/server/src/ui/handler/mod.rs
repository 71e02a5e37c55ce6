//! Request handlers.

mod http;
mod websocket;

pub use http::{get_sessions, get_voice_connections, health_check};
pub use websocket::websocket_handler;
