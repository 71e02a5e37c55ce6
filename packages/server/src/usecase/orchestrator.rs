//! UseCase: コマンドの実行
//!
//! ## 責務
//!
//! - コマンドをタイマーエンジン・通知・統計・プリセットへ振り分ける
//! - 通知付き開始の前提条件（音声接続済み）の確認
//! - バックグラウンド掃除とシャットダウンの管理
//!
//! ## 処理フロー（通知付き開始）
//!
//! 1. 引数またはプリセットから設定を決定
//! 2. スコープに音声接続があることを確認
//! 3. セッションを開始
//! 4. 音声接続がまだあることを再確認（途中で leave-audio された場合は停止して NotJoined）
//! 5. 開始音を切り離して再生

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{
    ChannelId, ConnectionStatus, NewSession, Preset, PresetRepository, ScopeId, SessionConfig,
    SessionError, SessionSnapshot, Sound, StatsRepository, UserId, UserStats, VoiceError,
    VoiceTarget,
};

use super::{
    command::{Command, StartArgs},
    error::CommandError,
    maintenance::{MaintenanceHandle, SweepConfig, spawn_maintenance},
    notifier::Notifier,
    timer_engine::TimerEngine,
};

/// Who issued a command, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub user_id: UserId,
    pub scope_id: ScopeId,
    /// Channel the command was typed in
    pub channel_id: ChannelId,
}

/// Successful result of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Started(SessionSnapshot),
    Snapshot(SessionSnapshot),
    Stopped {
        user_id: UserId,
    },
    Stats {
        user_id: UserId,
        stats: UserStats,
    },
    AudioJoined {
        scope_id: ScopeId,
        channel_id: ChannelId,
    },
    AudioLeft {
        scope_id: ScopeId,
        stopped: Vec<UserId>,
    },
    Presets(Vec<Preset>),
    Help {
        voice_enabled: bool,
    },
}

pub struct SessionOrchestrator {
    engine: TimerEngine,
    notifier: Arc<Notifier>,
    stats: Arc<dyn StatsRepository>,
    presets: Arc<dyn PresetRepository>,
    maintenance: Mutex<Option<MaintenanceHandle>>,
}

impl SessionOrchestrator {
    pub fn new(
        engine: TimerEngine,
        notifier: Arc<Notifier>,
        stats: Arc<dyn StatsRepository>,
        presets: Arc<dyn PresetRepository>,
    ) -> Self {
        Self {
            engine,
            notifier,
            stats,
            presets,
            maintenance: Mutex::new(None),
        }
    }

    /// Run one command for `context`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` without changing any state.
    pub async fn execute(
        &self,
        context: &CommandContext,
        command: Command,
    ) -> Result<CommandOutcome, CommandError> {
        let user_id = &context.user_id;
        match command {
            Command::Start { args, notified } => self.start(context, args, notified).await,
            Command::StopSession | Command::Stop => {
                if self.engine.stop(user_id).await {
                    Ok(CommandOutcome::Stopped {
                        user_id: user_id.clone(),
                    })
                } else {
                    Err(SessionError::NotFound.into())
                }
            }
            Command::Status => self
                .engine
                .snapshot(user_id)
                .await
                .map(CommandOutcome::Snapshot)
                .ok_or(SessionError::NotFound.into()),
            Command::Stats => Ok(CommandOutcome::Stats {
                user_id: user_id.clone(),
                stats: self.stats.get(user_id).await,
            }),
            Command::JoinAudio { channel_id } => {
                let target = channel_id.map(|channel_id| VoiceTarget { channel_id });
                self.notifier
                    .join(&context.scope_id, target.clone())
                    .await?;
                let channel_id = target.map(|t| t.channel_id).ok_or(VoiceError::NoTarget)?;
                Ok(CommandOutcome::AudioJoined {
                    scope_id: context.scope_id.clone(),
                    channel_id,
                })
            }
            Command::LeaveAudio => {
                if !self.notifier.leave(&context.scope_id) {
                    return Err(CommandError::NotJoined);
                }
                let stopped = self.engine.stop_notified_in_scope(&context.scope_id).await;
                Ok(CommandOutcome::AudioLeft {
                    scope_id: context.scope_id.clone(),
                    stopped,
                })
            }
            Command::Pause => Ok(CommandOutcome::Snapshot(self.engine.pause(user_id).await?)),
            Command::Resume => Ok(CommandOutcome::Snapshot(self.engine.resume(user_id).await?)),
            Command::PresetSave { name, config } => {
                tracing::info!("'{}' saved preset '{}'", user_id, name);
                self.presets.save(user_id, Preset { name, config }).await;
                Ok(CommandOutcome::Presets(self.presets.list(user_id).await))
            }
            Command::PresetList => Ok(CommandOutcome::Presets(self.presets.list(user_id).await)),
            Command::Help => Ok(CommandOutcome::Help {
                voice_enabled: self.notifier.is_enabled(),
            }),
        }
    }

    async fn start(
        &self,
        context: &CommandContext,
        args: StartArgs,
        notified: bool,
    ) -> Result<CommandOutcome, CommandError> {
        let config = match args {
            StartArgs::Defaults => SessionConfig::default(),
            StartArgs::Explicit(config) => config,
            StartArgs::Preset(name) => self
                .presets
                .find(&context.user_id, &name)
                .await
                .map(|preset| preset.config)
                .ok_or_else(|| CommandError::PresetNotFound(name.into_string()))?,
        };

        if notified {
            if !self.notifier.is_enabled() {
                return Err(VoiceError::Unavailable.into());
            }
            if !self.notifier.is_connected(&context.scope_id) {
                return Err(CommandError::NotJoined);
            }
        }

        let snapshot = self
            .engine
            .start_session(NewSession {
                user_id: context.user_id.clone(),
                scope_id: context.scope_id.clone(),
                channel_id: context.channel_id.clone(),
                config,
                notifications_enabled: notified,
            })
            .await?;

        if notified {
            // a leave-audio may have run while the session was being stored
            if !self.notifier.is_connected(&context.scope_id) {
                self.engine.stop(&context.user_id).await;
                return Err(CommandError::NotJoined);
            }
            self.notifier
                .play_detached(context.scope_id.clone(), Sound::Start);
        }
        Ok(CommandOutcome::Started(snapshot))
    }

    /// Snapshots of every live session
    pub async fn active_sessions(&self) -> Vec<SessionSnapshot> {
        self.engine.snapshots().await
    }

    pub fn voice_connections(&self) -> Vec<(ScopeId, ConnectionStatus)> {
        self.notifier.connection_statuses()
    }

    /// Start the periodic sweeps, replacing any running ones.
    pub fn start_maintenance(&self, config: SweepConfig) {
        let handle = spawn_maintenance(self.engine.clone(), self.notifier.clone(), config);
        *self
            .maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Stop sweeps, cancel every timer, then release all voice resources.
    pub async fn shutdown(&self) {
        let maintenance = self
            .maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(maintenance) = maintenance {
            maintenance.stop();
        }
        self.engine.shutdown().await;
        self.notifier.shutdown();
    }
}
