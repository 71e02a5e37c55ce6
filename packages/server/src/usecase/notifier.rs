//! UseCase: 音声通知の配信
//!
//! ## 責務
//!
//! - スコープごとの音声接続の確立・切断・健全性チェック
//! - フェーズ境界での通知音の再生
//!
//! ## 設計ノート
//!
//! `play` は失敗してもエラーを返しません。結果は bool で返し、呼び出し側は
//! ログに残すだけです。再生の成否がセッションの状態に影響することはありません。

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::timeout};

use crate::domain::{
    AudioPlayer, ConnectionStatus, PlayerStatus, ScopeId, Sound, SoundClip, SoundSource,
    VoiceError, VoiceGateway, VoiceTarget,
};

use super::connection_registry::{ConnectionRecord, ConnectionRegistry, spawn_watchdog};

/// Timing limits for voice connections and playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierConfig {
    /// How long `join` waits for the connection to become Ready
    pub join_timeout: Duration,
    /// How long `play` waits for a reconnecting connection
    pub recovery_timeout: Duration,
    /// Upper bound for one playback
    pub playback_timeout: Duration,
    /// How long a disconnected connection gets to start reconnecting
    pub reconnect_grace: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(10),
            recovery_timeout: Duration::from_secs(3),
            playback_timeout: Duration::from_secs(8),
            reconnect_grace: Duration::from_secs(5),
        }
    }
}

/// Audio notification delivery.
///
/// Built without a gateway, every voice operation reports `Unavailable` and
/// playback is skipped.
pub struct Notifier {
    gateway: Option<Arc<dyn VoiceGateway>>,
    registry: ConnectionRegistry,
    sounds: Arc<dyn SoundSource>,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(
        gateway: Option<Arc<dyn VoiceGateway>>,
        registry: ConnectionRegistry,
        sounds: Arc<dyn SoundSource>,
        config: NotifierConfig,
    ) -> Self {
        Self {
            gateway,
            registry,
            sounds,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gateway.is_some()
    }

    /// Whether the scope has a connection record
    pub fn is_connected(&self, scope_id: &ScopeId) -> bool {
        self.registry.get(scope_id).is_some()
    }

    /// Current status of every connection, ordered by scope
    pub fn connection_statuses(&self) -> Vec<(ScopeId, ConnectionStatus)> {
        self.registry
            .records()
            .into_iter()
            .map(|record| (record.scope_id().clone(), record.status()))
            .collect()
    }

    /// Connect the scope to a voice channel.
    ///
    /// An existing connection of the scope is torn down first.
    ///
    /// # Errors
    ///
    /// * `Unavailable` - voice is disabled
    /// * `NoTarget` - no channel given
    /// * `JoinFailed` - the gateway refused or the connection closed while joining
    /// * `Timeout` - not Ready within `join_timeout`
    pub async fn join(
        &self,
        scope_id: &ScopeId,
        target: Option<VoiceTarget>,
    ) -> Result<(), VoiceError> {
        let gateway = self.gateway.as_ref().ok_or(VoiceError::Unavailable)?;
        let target = target.ok_or(VoiceError::NoTarget)?;

        if self.registry.teardown(scope_id) {
            tracing::info!("Replacing voice connection of scope '{}'", scope_id);
        }

        let transport = gateway.connect(scope_id, &target).await?;
        let mut status = transport.status();
        let record = Arc::new(ConnectionRecord::new(
            self.registry.next_record_id(),
            scope_id.clone(),
            target,
            transport,
        ));
        if let Some(previous) = self.registry.insert(record.clone()) {
            previous.close();
        }

        let reached = timeout(
            self.config.join_timeout,
            status.wait_for(|s| matches!(s, ConnectionStatus::Ready | ConnectionStatus::Destroyed)),
        )
        .await
        .map(|result| result.map(|s| *s));

        match reached {
            Ok(Ok(ConnectionStatus::Ready)) => {}
            Ok(_) => {
                self.registry.teardown_record(scope_id, record.id());
                return Err(VoiceError::JoinFailed(
                    "connection closed while joining".to_string(),
                ));
            }
            Err(_) => {
                tracing::warn!(
                    "Voice connection of scope '{}' not ready within {:?}",
                    scope_id,
                    self.config.join_timeout
                );
                self.registry.teardown_record(scope_id, record.id());
                return Err(VoiceError::Timeout);
            }
        }

        record.set_watchdog(spawn_watchdog(
            self.registry.clone(),
            scope_id.clone(),
            record.id(),
            record.transport().status(),
            self.config.reconnect_grace,
        ));
        tracing::info!(
            "Joined voice channel '{}' in scope '{}'",
            record.target().channel_id,
            scope_id
        );
        Ok(())
    }

    /// Disconnect the scope. Returns whether a connection existed.
    pub fn leave(&self, scope_id: &ScopeId) -> bool {
        let left = self.registry.teardown(scope_id);
        if left {
            tracing::info!("Left voice channel in scope '{}'", scope_id);
        }
        left
    }

    /// Play `sound` in the scope's voice channel.
    ///
    /// Returns true only if the sound played to the end. A later play in the
    /// same scope stops this one, which then reports false. Never fails.
    pub async fn play(&self, scope_id: &ScopeId, sound: Sound) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(record) = self.registry.get(scope_id) else {
            tracing::debug!("No voice connection in scope '{}'", scope_id);
            return false;
        };

        let mut status = record.transport().status();
        let ready = timeout(
            self.config.recovery_timeout,
            status.wait_for(|s| *s == ConnectionStatus::Ready),
        )
        .await
        .is_ok_and(|result| result.is_ok());
        if !ready {
            tracing::warn!(
                "Voice connection of scope '{}' not ready, skipping {:?}",
                scope_id,
                sound
            );
            return false;
        }

        let Some(clip) = self.sounds.resolve(sound).await else {
            return false;
        };

        let player = record.transport().create_player();
        record.replace_player(player.clone());
        record.transport().subscribe(player.clone());

        let result = self.run_player(&player, &clip).await;
        record.transport().unsubscribe(player.id());

        match result {
            Ok(()) if record.is_player_superseded(player.id()) => {
                tracing::debug!("{:?} in scope '{}' was cut off by a later sound", sound, scope_id);
                false
            }
            Ok(()) => {
                tracing::debug!("Played {:?} in scope '{}'", sound, scope_id);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to play {:?} in scope '{}': {}", sound, scope_id, e);
                false
            }
        }
    }

    /// Play on a detached task; the result is only logged.
    pub fn play_detached(self: &Arc<Self>, scope_id: ScopeId, sound: Sound) -> JoinHandle<()> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            let played = notifier.play(&scope_id, sound).await;
            tracing::debug!(
                "Notification {:?} for scope '{}' finished (played: {})",
                sound,
                scope_id,
                played
            );
        })
    }

    async fn run_player(
        &self,
        player: &Arc<dyn AudioPlayer>,
        clip: &SoundClip,
    ) -> Result<(), VoiceError> {
        player.play(clip)?;
        let mut status = player.status();
        let finished = timeout(
            self.config.playback_timeout,
            status.wait_for(|s| matches!(s, PlayerStatus::Idle | PlayerStatus::Errored(_))),
        )
        .await
        .map(|result| result.map(|s| s.clone()));

        match finished {
            Ok(Ok(PlayerStatus::Errored(reason))) => Err(VoiceError::Playback(reason)),
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(VoiceError::Playback("player went away".to_string())),
            Err(_) => {
                player.stop();
                Err(VoiceError::Timeout)
            }
        }
    }

    /// Log every connection's status and tear down dead ones.
    ///
    /// Returns how many connections were torn down.
    pub fn health_sweep(&self) -> usize {
        let mut torn_down = 0;
        for record in self.registry.records() {
            let status = record.status();
            tracing::info!(
                "Voice connection of scope '{}': {}",
                record.scope_id(),
                status
            );
            if status.is_dead() && self.registry.teardown_record(record.scope_id(), record.id()) {
                torn_down += 1;
            }
        }
        torn_down
    }

    /// Drop players that finished playing. Returns how many were released.
    pub fn release_idle_players(&self) -> usize {
        self.registry
            .records()
            .iter()
            .filter(|record| record.release_idle_player())
            .count()
    }

    /// Stop all players and destroy all connections.
    pub fn shutdown(&self) {
        let records = self.registry.drain();
        for record in &records {
            record.close();
        }
        tracing::info!("Notifier stopped ({} connection(s) closed)", records.len());
    }
}
