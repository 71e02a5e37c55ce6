//! Utilities shared by the Focusbell server and client.

pub mod logger;
pub mod time;
