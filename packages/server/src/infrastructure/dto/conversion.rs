//! Conversion logic between domain entities and DTOs.

use crate::domain::{Preset, SessionEvent, SessionEventKind, SessionSnapshot};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&SessionSnapshot> for dto::SessionSnapshotDto {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            user_id: snapshot.user_id.as_str().to_string(),
            scope_id: snapshot.scope_id.as_str().to_string(),
            phase: snapshot.phase.label().to_string(),
            paused: snapshot.paused,
            remaining: focusbell_shared::time::format_mm_ss(snapshot.remaining),
            remaining_ms: u64::try_from(snapshot.remaining.as_millis()).unwrap_or(u64::MAX),
            cycle: snapshot.current_cycle,
            total_cycles: snapshot.config.total_cycles(),
            next_phase: snapshot.next_phase.label().to_string(),
            notifications_enabled: snapshot.notifications_enabled,
            work_minutes: snapshot.config.work_minutes(),
            break_minutes: snapshot.config.break_minutes(),
            started_at: snapshot.started_at.value(),
        }
    }
}

impl From<&SessionEvent> for dto::ServerMessage {
    fn from(event: &SessionEvent) -> Self {
        match event.kind {
            SessionEventKind::WorkEnded {
                cycle,
                total_cycles,
            } => dto::ServerMessage::WorkEnded {
                cycle,
                total_cycles,
                session: (&event.snapshot).into(),
            },
            SessionEventKind::BreakEnded {
                cycle,
                total_cycles,
            } => dto::ServerMessage::BreakEnded {
                cycle,
                total_cycles,
                session: (&event.snapshot).into(),
            },
            SessionEventKind::Completed { total_cycles } => dto::ServerMessage::SessionCompleted {
                user_id: event.snapshot.user_id.as_str().to_string(),
                total_cycles,
            },
        }
    }
}

impl From<&Preset> for dto::PresetDto {
    fn from(preset: &Preset) -> Self {
        Self {
            name: preset.name.as_str().to_string(),
            work_minutes: preset.config.work_minutes(),
            break_minutes: preset.config.break_minutes(),
            cycles: preset.config.total_cycles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{
        ChannelId, NextPhase, Phase, ScopeId, SessionConfig, SessionId, Timestamp, UserId,
    };

    fn create_test_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            session_id: SessionId::generate(),
            user_id: UserId::new("alice".to_string()).unwrap(),
            scope_id: ScopeId::new("guild-1".to_string()).unwrap(),
            channel_id: ChannelId::new("general".to_string()).unwrap(),
            config: SessionConfig::new(25, 5, 4).unwrap(),
            phase: Phase::Resting,
            paused: false,
            terminated: false,
            remaining: Duration::from_millis(299_500),
            current_cycle: 1,
            next_phase: NextPhase::Work,
            notifications_enabled: true,
            started_at: Timestamp::new(1_000),
        }
    }

    #[test]
    fn test_snapshot_to_dto() {
        // テスト項目: スナップショットが表示用 DTO に変換される
        // given (前提条件):
        let snapshot = create_test_snapshot();

        // when (操作):
        let dto: dto::SessionSnapshotDto = (&snapshot).into();

        // then (期待する結果):
        assert_eq!(dto.phase, "break");
        assert_eq!(dto.remaining, "4:59");
        assert_eq!(dto.remaining_ms, 299_500);
        assert_eq!(dto.cycle, 1);
        assert_eq!(dto.total_cycles, 4);
        assert_eq!(dto.next_phase, "work");
    }

    #[test]
    fn test_work_ended_event_to_message() {
        // テスト項目: 作業終了イベントが work-ended メッセージに変換される
        // given (前提条件):
        let event = SessionEvent::new(
            SessionEventKind::WorkEnded {
                cycle: 1,
                total_cycles: 4,
            },
            create_test_snapshot(),
        );

        // when (操作):
        let message: dto::ServerMessage = (&event).into();

        // then (期待する結果):
        assert!(matches!(
            message,
            dto::ServerMessage::WorkEnded {
                cycle: 1,
                total_cycles: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_completed_event_to_message() {
        // テスト項目: 完了イベントが session-completed メッセージに変換される
        // given (前提条件):
        let event = SessionEvent::new(
            SessionEventKind::Completed { total_cycles: 4 },
            create_test_snapshot(),
        );

        // when (操作):
        let message: dto::ServerMessage = (&event).into();

        // then (期待する結果):
        assert_eq!(
            message,
            dto::ServerMessage::SessionCompleted {
                user_id: "alice".to_string(),
                total_cycles: 4,
            }
        );
    }
}
