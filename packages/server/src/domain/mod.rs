//! Domain layer: focus sessions, phase timers and the voice notification seam.
//!
//! Nothing here performs I/O. Stores, transports and message delivery are
//! expressed as traits that the infrastructure layer implements.

pub mod error;
pub mod event;
pub mod pusher;
pub mod repository;
pub mod session;
pub mod timer;
pub mod value_object;
pub mod voice;

pub use error::{MessagePushError, RepositoryError, SessionError, ValueObjectError, VoiceError};
pub use event::{SessionEvent, SessionEventKind, Sound};
pub use pusher::{MessagePusher, PusherChannel};
pub use repository::{
    Preset, PresetRepository, SessionEntry, SessionRepository, SharedSession, StatsRepository,
    UserStats,
};
pub use session::{NewSession, NextPhase, Phase, Session, SessionConfig, SessionSnapshot};
pub use timer::{ScheduledTimer, TimerId};
pub use value_object::{ChannelId, PresetName, ScopeId, SessionId, Timestamp, UserId};
pub use voice::{
    AudioPlayer, ConnectionStatus, PlayerStatus, SoundClip, SoundSource, VoiceGateway,
    VoiceTarget, VoiceTransport,
};

#[cfg(test)]
pub use pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::MockStatsRepository;
