//! Focus session server: work/break timers per user with audio notifications
//! delivered over per-scope voice connections.

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
