//! UseCase: フェーズ境界イベントへの反応
//!
//! タイマーエンジンから届いたイベントごとに、統計の記録・クライアントへの通知・
//! 通知音の再生（通知付きセッションのみ）を行います。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{MessagePusher, SessionEvent, SessionEventKind, StatsRepository};

use super::{notifier::Notifier, timer_engine::SessionEventListener};

pub struct SessionReactor {
    stats: Arc<dyn StatsRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    notifier: Arc<Notifier>,
}

impl SessionReactor {
    pub fn new(
        stats: Arc<dyn StatsRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            stats,
            message_pusher,
            notifier,
        }
    }
}

#[async_trait]
impl SessionEventListener for SessionReactor {
    async fn on_session_event(&self, event: SessionEvent) {
        let snapshot = &event.snapshot;
        match event.kind {
            SessionEventKind::WorkEnded { .. } => {
                self.stats
                    .record_work_unit(&snapshot.user_id, snapshot.config.work_minutes())
                    .await;
            }
            SessionEventKind::Completed { .. } => {
                self.stats.record_completion(&snapshot.user_id).await;
            }
            SessionEventKind::BreakEnded { .. } => {}
        }

        if let Err(e) = self.message_pusher.push_event(&event).await {
            tracing::warn!("Failed to push event to '{}': {}", snapshot.user_id, e);
        }

        if snapshot.notifications_enabled {
            self.notifier
                .play_detached(snapshot.scope_id.clone(), event.kind.sound());
        }
    }
}
