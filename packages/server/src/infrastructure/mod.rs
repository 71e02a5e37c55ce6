//! Infrastructure layer: concrete stores, client push and voice transports.

pub mod dto;
pub mod message_pusher;
pub mod repository;
pub mod voice;
