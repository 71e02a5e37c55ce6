//! Periodic background sweeps.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::{notifier::Notifier, timer_engine::TimerEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Finished sessions and idle players
    pub session_interval: Duration,
    /// Voice connection health
    pub health_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            session_interval: Duration::from_secs(5 * 60),
            health_interval: Duration::from_secs(2 * 60),
        }
    }
}

/// Running sweep tasks. Dropping the handle stops them.
pub struct MaintenanceHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl MaintenanceHandle {
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub fn spawn_maintenance(
    engine: TimerEngine,
    notifier: Arc<Notifier>,
    config: SweepConfig,
) -> MaintenanceHandle {
    let sweep_notifier = notifier.clone();
    let session_task = tokio::spawn(async move {
        let mut interval = delayed_interval(config.session_interval);
        loop {
            interval.tick().await;
            let sessions = engine.sweep().await;
            let players = sweep_notifier.release_idle_players();
            tracing::debug!(
                "Sweep removed {} session(s) and released {} player(s)",
                sessions,
                players
            );
        }
    });

    let health_task = tokio::spawn(async move {
        let mut interval = delayed_interval(config.health_interval);
        loop {
            interval.tick().await;
            let torn_down = notifier.health_sweep();
            if torn_down > 0 {
                tracing::warn!("Health check tore down {} voice connection(s)", torn_down);
            }
        }
    });

    MaintenanceHandle {
        tasks: vec![session_task, health_task],
    }
}

/// Interval whose first tick is one period from now
fn delayed_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use focusbell_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::{
            ChannelId, ConnectionStatus, NewSession, ScopeId, SessionConfig, SessionRepository,
            SoundClip, SoundSource, Sound, UserId, VoiceTarget,
        },
        infrastructure::{repository::InMemorySessionRepository, voice::LoopbackVoiceGateway},
        usecase::{
            connection_registry::ConnectionRegistry,
            notifier::NotifierConfig,
            timer_engine::MockSessionEventListener,
        },
    };

    struct NoSounds;

    #[async_trait]
    impl SoundSource for NoSounds {
        async fn resolve(&self, _sound: Sound) -> Option<SoundClip> {
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_sweep_runs_every_five_minutes() {
        // テスト項目: 5 分ごとの掃除で終了済みセッションが削除される
        // given (前提条件):
        let repository = Arc::new(InMemorySessionRepository::new());
        let engine = TimerEngine::spawn(
            repository.clone(),
            Arc::new(MockSessionEventListener::new()),
            Arc::new(FixedClock::new(0)),
        );
        let notifier = Arc::new(Notifier::new(
            None,
            ConnectionRegistry::new(),
            Arc::new(NoSounds),
            NotifierConfig::default(),
        ));
        let alice = UserId::new("alice".to_string()).unwrap();
        engine
            .start_session(NewSession {
                user_id: alice.clone(),
                scope_id: ScopeId::new("guild-1".to_string()).unwrap(),
                channel_id: ChannelId::new("general".to_string()).unwrap(),
                config: SessionConfig::new(60, 5, 1).unwrap(),
                notifications_enabled: false,
            })
            .await
            .unwrap();
        repository
            .get(&alice)
            .await
            .unwrap()
            .session
            .lock()
            .await
            .terminate();
        let _handle = spawn_maintenance(engine, notifier, SweepConfig::default());

        // when (操作):
        tokio::time::sleep(Duration::from_secs(4 * 60)).await;
        let before = repository.count().await;
        tokio::time::sleep(Duration::from_secs(61)).await;
        let after = repository.count().await;

        // then (期待する結果):
        assert_eq!(before, 1);
        assert_eq!(after, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_sweep_runs_every_two_minutes() {
        // テスト項目: 2 分ごとのヘルスチェックで切断済みの接続が破棄される
        // given (前提条件):
        let gateway = Arc::new(LoopbackVoiceGateway::default());
        let registry = ConnectionRegistry::new();
        let notifier = Arc::new(Notifier::new(
            Some(gateway.clone()),
            registry.clone(),
            Arc::new(NoSounds),
            NotifierConfig::default(),
        ));
        let scope = ScopeId::new("guild-1".to_string()).unwrap();
        notifier
            .join(
                &scope,
                Some(VoiceTarget {
                    channel_id: ChannelId::new("voice-1".to_string()).unwrap(),
                }),
            )
            .await
            .unwrap();
        // replace the watchdog so only the sweep reacts
        registry
            .get(&scope)
            .unwrap()
            .set_watchdog(tokio::spawn(async {}));
        gateway
            .transport(&scope)
            .unwrap()
            .set_status(ConnectionStatus::Disconnected);
        let engine = TimerEngine::spawn(
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(MockSessionEventListener::new()),
            Arc::new(FixedClock::new(0)),
        );
        let handle = spawn_maintenance(engine, notifier.clone(), SweepConfig::default());

        // when (操作):
        tokio::time::sleep(Duration::from_secs(2 * 60 + 1)).await;
        handle.stop();

        // then (期待する結果):
        assert!(!notifier.is_connected(&scope));
    }
}
