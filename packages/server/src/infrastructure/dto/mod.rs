//! Data Transfer Objects (DTOs) for the focus session server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: messages pushed to WebSocket clients
//! - `http`: HTTP API response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
