//! WebSocket message DTOs.
//!
//! Clients send plain text commands; everything the server sends back is one
//! of the `ServerMessage` variants, tagged by `type`.

use serde::{Deserialize, Serialize};

/// Session state as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshotDto {
    pub user_id: String,
    pub scope_id: String,
    /// "work" or "break"
    pub phase: String,
    pub paused: bool,
    /// Remaining time as `m:ss`
    pub remaining: String,
    pub remaining_ms: u64,
    pub cycle: u32,
    pub total_cycles: u32,
    /// "break", "work" or "complete"
    pub next_phase: String,
    pub notifications_enabled: bool,
    pub work_minutes: u32,
    pub break_minutes: u32,
    /// Unix timestamp (milliseconds)
    pub started_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetDto {
    pub name: String,
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub cycles: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandHelpDto {
    pub usage: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    SessionStarted {
        session: SessionSnapshotDto,
    },
    SessionSnapshot {
        session: SessionSnapshotDto,
    },
    WorkEnded {
        cycle: u32,
        total_cycles: u32,
        session: SessionSnapshotDto,
    },
    BreakEnded {
        cycle: u32,
        total_cycles: u32,
        session: SessionSnapshotDto,
    },
    SessionCompleted {
        user_id: String,
        total_cycles: u32,
    },
    SessionStopped {
        user_id: String,
    },
    Stats {
        user_id: String,
        work_units: u32,
        completed_sessions: u32,
        focus_minutes: u64,
    },
    AudioJoined {
        scope_id: String,
        channel_id: String,
    },
    AudioLeft {
        scope_id: String,
        stopped_sessions: Vec<String>,
    },
    Presets {
        presets: Vec<PresetDto>,
    },
    Help {
        commands: Vec<CommandHelpDto>,
        voice_enabled: bool,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Serialize for the wire
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize server message: {}", e);
                r#"{"type":"error","code":"internal","message":"serialization failed"}"#
                    .to_string()
            }
        }
    }
}
