//! UseCase layer: timer engine, notification delivery and command handling.

pub mod command;
pub mod connection_registry;
pub mod error;
pub mod maintenance;
pub mod notifier;
pub mod orchestrator;
pub mod reactor;
pub mod timer_engine;

pub use command::{COMMANDS, Command, StartArgs};
pub use connection_registry::{ConnectionRecord, ConnectionRegistry};
pub use error::CommandError;
pub use maintenance::{MaintenanceHandle, SweepConfig};
pub use notifier::{Notifier, NotifierConfig};
pub use orchestrator::{CommandContext, CommandOutcome, SessionOrchestrator};
pub use reactor::SessionReactor;
pub use timer_engine::{SessionEventListener, TimerEngine};
