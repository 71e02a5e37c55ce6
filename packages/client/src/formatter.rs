//! Message formatting utilities for client display.

use focusbell_server::infrastructure::dto::websocket::{
    CommandHelpDto, PresetDto, ServerMessage, SessionSnapshotDto,
};
use focusbell_shared::time::timestamp_to_jst_rfc3339;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Render any server message as terminal text
    pub fn format(message: &ServerMessage) -> String {
        match message {
            ServerMessage::SessionStarted { session } => {
                format!("\n▶ Session started\n{}", Self::format_session(session))
            }
            ServerMessage::SessionSnapshot { session } => Self::format_session(session),
            ServerMessage::WorkEnded {
                cycle,
                total_cycles,
                session,
            } => format!(
                "\n⏰ Work {}/{} done. Break for {} minutes ({} left)\n",
                cycle, total_cycles, session.break_minutes, session.remaining
            ),
            ServerMessage::BreakEnded {
                cycle,
                total_cycles,
                session,
            } => format!(
                "\n⏰ Break over. Work {}/{} for {} minutes ({} left)\n",
                cycle, total_cycles, session.work_minutes, session.remaining
            ),
            ServerMessage::SessionCompleted {
                user_id,
                total_cycles,
            } => format!(
                "\n✔ {} completed all {} cycles. Nice work!\n",
                user_id, total_cycles
            ),
            ServerMessage::SessionStopped { user_id } => {
                format!("\n■ Session of {} stopped\n", user_id)
            }
            ServerMessage::Stats {
                user_id,
                work_units,
                completed_sessions,
                focus_minutes,
            } => format!(
                "\nStats for {}: {} work units, {} completed sessions, {} focus minutes\n",
                user_id, work_units, completed_sessions, focus_minutes
            ),
            ServerMessage::AudioJoined {
                scope_id,
                channel_id,
            } => format!(
                "\n♪ Joined voice channel {} in {}\n",
                channel_id, scope_id
            ),
            ServerMessage::AudioLeft {
                scope_id,
                stopped_sessions,
            } => Self::format_audio_left(scope_id, stopped_sessions),
            ServerMessage::Presets { presets } => Self::format_presets(presets),
            ServerMessage::Help {
                commands,
                voice_enabled,
            } => Self::format_help(commands, *voice_enabled),
            ServerMessage::Error { code, message } => {
                format!("\n✖ {} ({})\n", message, code)
            }
        }
    }

    /// Format a session snapshot block
    pub fn format_session(session: &SessionSnapshotDto) -> String {
        let state = if session.paused { " (paused)" } else { "" };
        let bell = if session.notifications_enabled {
            "on"
        } else {
            "off"
        };
        format!(
            "\n{RULE}\n\
             {} - {}{} {} left, cycle {}/{}\n\
             next: {}, {}/{} min, sound {}\n\
             started at {}\n\
             {RULE}\n",
            session.user_id,
            session.phase,
            state,
            session.remaining,
            session.cycle,
            session.total_cycles,
            session.next_phase,
            session.work_minutes,
            session.break_minutes,
            bell,
            timestamp_to_jst_rfc3339(session.started_at),
        )
    }

    fn format_audio_left(scope_id: &str, stopped_sessions: &[String]) -> String {
        if stopped_sessions.is_empty() {
            format!("\n♪ Left voice in {}\n", scope_id)
        } else {
            format!(
                "\n♪ Left voice in {}, stopped sessions of {}\n",
                scope_id,
                stopped_sessions.join(", ")
            )
        }
    }

    fn format_presets(presets: &[PresetDto]) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{RULE}\nPresets:\n"));

        if presets.is_empty() {
            output.push_str("(No presets)\n");
        } else {
            for preset in presets {
                output.push_str(&format!(
                    "{} - {}/{} min x {}\n",
                    preset.name, preset.work_minutes, preset.break_minutes, preset.cycles
                ));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    fn format_help(commands: &[CommandHelpDto], voice_enabled: bool) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{RULE}\nCommands:\n"));
        for command in commands {
            output.push_str(&format!("  {:<40} {}\n", command.usage, command.description));
        }
        if !voice_enabled {
            output.push_str("(voice notifications are disabled on this server)\n");
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
