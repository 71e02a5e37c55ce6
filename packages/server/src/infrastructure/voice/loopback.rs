//! Loopback voice transport.
//!
//! Simulates a platform voice connection inside the process: connections turn
//! Ready after a configurable delay and players "play" a clip by waiting for
//! its configured length. Used when no platform voice backend is wired in, and
//! by tests to drive connection status changes by hand.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::watch, task::JoinHandle};

use crate::domain::{
    AudioPlayer, ChannelId, ConnectionStatus, PlayerStatus, ScopeId, SoundClip, VoiceError,
    VoiceGateway, VoiceTarget, VoiceTransport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackBehavior {
    /// Finish (go Idle) after the given time
    Finish(Duration),
    /// Error out as soon as playback starts
    Fail(String),
    /// Never finish and never error
    Hang,
}

#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Delay before a new connection turns Ready; `None` never turns Ready
    pub ready_after: Option<Duration>,
    /// Refuse every join
    pub refuse_join: bool,
    pub playback: PlaybackBehavior,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            ready_after: Some(Duration::from_millis(250)),
            refuse_join: false,
            playback: PlaybackBehavior::Finish(Duration::from_secs(2)),
        }
    }
}

pub struct LoopbackVoiceGateway {
    config: LoopbackConfig,
    /// Most recent transport per scope
    transports: Mutex<HashMap<ScopeId, Arc<LoopbackTransport>>>,
    next_player_id: Arc<AtomicU64>,
}

impl LoopbackVoiceGateway {
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            transports: Mutex::new(HashMap::new()),
            next_player_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The most recent transport opened for `scope_id`
    pub fn transport(&self, scope_id: &ScopeId) -> Option<Arc<LoopbackTransport>> {
        self.transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope_id)
            .cloned()
    }
}

impl Default for LoopbackVoiceGateway {
    fn default() -> Self {
        Self::new(LoopbackConfig::default())
    }
}

#[async_trait]
impl VoiceGateway for LoopbackVoiceGateway {
    async fn connect(
        &self,
        scope_id: &ScopeId,
        target: &VoiceTarget,
    ) -> Result<Arc<dyn VoiceTransport>, VoiceError> {
        let config = &self.config;
        if config.refuse_join {
            return Err(VoiceError::JoinFailed(format!(
                "channel '{}' refused the connection",
                target.channel_id
            )));
        }

        let transport = Arc::new(LoopbackTransport::new(
            target.channel_id.clone(),
            config.playback.clone(),
            self.next_player_id.clone(),
        ));
        if let Some(delay) = config.ready_after {
            let weak = Arc::downgrade(&transport);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(transport) = weak.upgrade() {
                    transport.finish_handshake();
                }
            });
        }

        tracing::debug!(
            "Loopback voice connection opened for scope '{}' (channel '{}')",
            scope_id,
            target.channel_id
        );
        self.transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope_id.clone(), transport.clone());
        Ok(transport)
    }
}

pub struct LoopbackTransport {
    channel_id: ChannelId,
    status_tx: watch::Sender<ConnectionStatus>,
    playback: PlaybackBehavior,
    next_player_id: Arc<AtomicU64>,
    subscriber: Mutex<Option<u64>>,
}

impl LoopbackTransport {
    fn new(
        channel_id: ChannelId,
        playback: PlaybackBehavior,
        next_player_id: Arc<AtomicU64>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            channel_id,
            status_tx,
            playback,
            next_player_id,
            subscriber: Mutex::new(None),
        }
    }

    fn finish_handshake(&self) {
        self.status_tx.send_if_modified(|status| {
            if status.is_reconnecting() {
                *status = ConnectionStatus::Ready;
                true
            } else {
                false
            }
        });
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn current_status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Force a status change, as the network would
    pub fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }

    /// Id of the currently subscribed player
    pub fn subscriber(&self) -> Option<u64> {
        *self.subscriber.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VoiceTransport for LoopbackTransport {
    fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    fn create_player(&self) -> Arc<dyn AudioPlayer> {
        let id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
        Arc::new(LoopbackPlayer::new(id, self.playback.clone()))
    }

    fn subscribe(&self, player: Arc<dyn AudioPlayer>) {
        *self.subscriber.lock().unwrap_or_else(PoisonError::into_inner) = Some(player.id());
    }

    fn unsubscribe(&self, player_id: u64) {
        let mut subscriber = self.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        if *subscriber == Some(player_id) {
            *subscriber = None;
        }
    }

    fn destroy(&self) {
        *self.subscriber.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.status_tx.send_replace(ConnectionStatus::Destroyed);
    }
}

pub struct LoopbackPlayer {
    id: u64,
    behavior: PlaybackBehavior,
    status_tx: Arc<watch::Sender<PlayerStatus>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LoopbackPlayer {
    fn new(id: u64, behavior: PlaybackBehavior) -> Self {
        let (status_tx, _) = watch::channel(PlayerStatus::Idle);
        Self {
            id,
            behavior,
            status_tx: Arc::new(status_tx),
            task: Mutex::new(None),
        }
    }

    fn finish_after(&self, length: Duration) -> JoinHandle<()> {
        let status_tx: Weak<watch::Sender<PlayerStatus>> = Arc::downgrade(&self.status_tx);
        tokio::spawn(async move {
            tokio::time::sleep(length).await;
            if let Some(status_tx) = status_tx.upgrade() {
                status_tx.send_replace(PlayerStatus::Idle);
            }
        })
    }
}

impl AudioPlayer for LoopbackPlayer {
    fn id(&self) -> u64 {
        self.id
    }

    fn status(&self) -> watch::Receiver<PlayerStatus> {
        self.status_tx.subscribe()
    }

    fn play(&self, clip: &SoundClip) -> Result<(), VoiceError> {
        tracing::debug!(
            "Loopback player {} playing {} at volume {:.1}",
            self.id,
            clip.path.display(),
            clip.volume
        );
        self.status_tx.send_replace(PlayerStatus::Buffering);
        match &self.behavior {
            PlaybackBehavior::Finish(length) => {
                self.status_tx.send_replace(PlayerStatus::Playing);
                let handle = self.finish_after(*length);
                if let Some(previous) = self
                    .task
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .replace(handle)
                {
                    previous.abort();
                }
            }
            PlaybackBehavior::Fail(reason) => {
                self.status_tx
                    .send_replace(PlayerStatus::Errored(reason.clone()));
            }
            PlaybackBehavior::Hang => {
                self.status_tx.send_replace(PlayerStatus::Playing);
            }
        }
        Ok(())
    }

    fn stop(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.status_tx.send_replace(PlayerStatus::Idle);
    }
}

impl Drop for LoopbackPlayer {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
