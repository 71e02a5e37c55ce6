//! Voice transport seam used for audio notifications.
//!
//! The chat platform's voice stack is external. These traits capture the
//! parts the notifier relies on: an observable connection status, single-use
//! players and per-connection subscription of one player at a time.

use std::{fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::sync::watch;

use super::{ChannelId, ScopeId, Sound, VoiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connecting,
    Signalling,
    Ready,
    Disconnected,
    Destroyed,
}

impl ConnectionStatus {
    /// The transport is working its way back to Ready
    pub fn is_reconnecting(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Signalling)
    }

    /// The transport will not deliver audio without outside help
    pub fn is_dead(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Destroyed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Signalling => "signalling",
            ConnectionStatus::Ready => "ready",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Buffering,
    Playing,
    Errored(String),
}

/// Voice channel to join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTarget {
    pub channel_id: ChannelId,
}

/// A resolved sound file ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct SoundClip {
    pub sound: Sound,
    pub path: PathBuf,
    pub volume: f32,
}

/// Resolves notification sounds to playable clips
#[async_trait]
pub trait SoundSource: Send + Sync {
    /// `None` when the sound is not available
    async fn resolve(&self, sound: Sound) -> Option<SoundClip>;
}

#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Open a transport to `target` for `scope_id`.
    ///
    /// The returned transport starts out connecting; callers wait for Ready.
    async fn connect(
        &self,
        scope_id: &ScopeId,
        target: &VoiceTarget,
    ) -> Result<Arc<dyn VoiceTransport>, VoiceError>;
}

pub trait VoiceTransport: Send + Sync {
    /// Subscribe to status changes. The receiver starts at the current status.
    fn status(&self) -> watch::Receiver<ConnectionStatus>;

    /// Create a fresh, single-use player
    fn create_player(&self) -> Arc<dyn AudioPlayer>;

    /// Route `player`'s output into this connection
    fn subscribe(&self, player: Arc<dyn AudioPlayer>);

    /// Detach the player `player_id` if it is the subscribed one
    fn unsubscribe(&self, player_id: u64);

    /// Release the connection. Status becomes Destroyed.
    fn destroy(&self);
}

pub trait AudioPlayer: Send + Sync {
    fn id(&self) -> u64;

    /// Subscribe to player status changes
    fn status(&self) -> watch::Receiver<PlayerStatus>;

    /// Start playing `clip`. The status leaves Idle before this returns.
    fn play(&self, clip: &SoundClip) -> Result<(), VoiceError>;

    /// Stop playback. The status becomes Idle.
    fn stop(&self);
}
