//! Text command parsing.
//!
//! Commands arrive as whitespace-separated tokens, the first one naming the
//! command. Argument counts follow a fixed rule for the start commands:
//! three or more arguments are work/break/cycles, exactly one is a preset
//! name, anything else falls back to the defaults.

use crate::domain::{ChannelId, PresetName, SessionConfig, SessionError};

use super::error::CommandError;

/// Usage line and description for every command, in display order
pub const COMMANDS: &[(&str, &str)] = &[
    (
        "start-session [work] [break] [cycles] | [preset]",
        "Start a focus session (default 25/5/4)",
    ),
    (
        "notified-start [work] [break] [cycles] | [preset]",
        "Start a session with audio notifications (join-audio first)",
    ),
    ("stop-session", "Stop your session"),
    ("status", "Show your session"),
    ("stats", "Show your totals"),
    ("join-audio <voice-channel>", "Join a voice channel for notifications"),
    (
        "leave-audio",
        "Leave the voice channel and stop notified sessions",
    ),
    ("pause", "Pause your session"),
    ("resume", "Resume your session"),
    ("stop", "Stop your session"),
    (
        "preset-save <name> <work> <break> <cycles>",
        "Save a session preset",
    ),
    ("preset-list", "List your presets"),
    ("help", "Show this help"),
];

const PRESET_SAVE_USAGE: &str = "preset-save <name> <work> <break> <cycles>";

/// How a start command picks its config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartArgs {
    Defaults,
    Explicit(SessionConfig),
    Preset(PresetName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { args: StartArgs, notified: bool },
    StopSession,
    Status,
    Stats,
    JoinAudio { channel_id: Option<ChannelId> },
    LeaveAudio,
    Pause,
    Resume,
    Stop,
    PresetSave { name: PresetName, config: SessionConfig },
    PresetList,
    Help,
}

impl Command {
    /// Parse one command line.
    ///
    /// # Errors
    ///
    /// * `UnknownCommand` - the first token is not a command (or the line is empty)
    /// * `Session(InvalidConfig)` - durations are not numbers or out of range
    /// * `Usage` / `InvalidArgument` - malformed `preset-save`
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Err(CommandError::UnknownCommand(String::new()));
        };
        let args: Vec<&str> = tokens.collect();

        let command = match name {
            "start-session" => Command::Start {
                args: parse_start_args(&args)?,
                notified: false,
            },
            "notified-start" => Command::Start {
                args: parse_start_args(&args)?,
                notified: true,
            },
            "stop-session" => Command::StopSession,
            "status" => Command::Status,
            "stats" => Command::Stats,
            "join-audio" => Command::JoinAudio {
                channel_id: args
                    .first()
                    .map(|channel| ChannelId::new(channel.to_string()))
                    .transpose()?,
            },
            "leave-audio" => Command::LeaveAudio,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "preset-save" => parse_preset_save(&args)?,
            "preset-list" => Command::PresetList,
            "help" => Command::Help,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

fn parse_start_args(args: &[&str]) -> Result<StartArgs, CommandError> {
    match args {
        [work, rest, cycles, ..] => Ok(StartArgs::Explicit(parse_config(work, rest, cycles)?)),
        [preset] => Ok(StartArgs::Preset(PresetName::new(preset.to_string())?)),
        _ => Ok(StartArgs::Defaults),
    }
}

fn parse_preset_save(args: &[&str]) -> Result<Command, CommandError> {
    let [name, work, rest, cycles] = args else {
        return Err(CommandError::Usage(PRESET_SAVE_USAGE));
    };
    Ok(Command::PresetSave {
        name: PresetName::new(name.to_string())?,
        config: parse_config(work, rest, cycles)?,
    })
}

fn parse_config(work: &str, rest: &str, cycles: &str) -> Result<SessionConfig, SessionError> {
    SessionConfig::new(
        parse_number(work)?,
        parse_number(rest)?,
        parse_number(cycles)?,
    )
}

fn parse_number(value: &str) -> Result<u32, SessionError> {
    value
        .parse()
        .map_err(|_| SessionError::InvalidConfig(format!("'{value}' is not a whole number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_without_arguments_uses_defaults() {
        // テスト項目: 引数なしの start-session はデフォルト設定になる
        // when (操作):
        let command = Command::parse("start-session").unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            Command::Start {
                args: StartArgs::Defaults,
                notified: false,
            }
        );
    }

    #[test]
    fn test_start_with_three_numbers() {
        // テスト項目: 3 つの数値は作業/休憩/サイクルとして解釈される
        // when (操作):
        let command = Command::parse("notified-start 50 10 2").unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            Command::Start {
                args: StartArgs::Explicit(SessionConfig::new(50, 10, 2).unwrap()),
                notified: true,
            }
        );
    }

    #[test]
    fn test_start_with_one_argument_is_preset() {
        // テスト項目: 引数 1 つはプリセット名として解釈される
        // when (操作):
        let command = Command::parse("start-session deep").unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            Command::Start {
                args: StartArgs::Preset(PresetName::new("deep".to_string()).unwrap()),
                notified: false,
            }
        );
    }

    #[test]
    fn test_start_with_two_arguments_uses_defaults() {
        // テスト項目: 引数 2 つはデフォルト設定にフォールバックする
        // when (操作):
        let command = Command::parse("start-session 50 10").unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            Command::Start {
                args: StartArgs::Defaults,
                notified: false,
            }
        );
    }

    #[test]
    fn test_start_rejects_out_of_range_work_time() {
        // テスト項目: 作業時間 200 分は InvalidConfig で拒否される
        // when (操作):
        let result = Command::parse("start-session 200 5 4");

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(CommandError::Session(SessionError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_start_rejects_non_numeric_arguments() {
        // テスト項目: 数値でない引数は InvalidConfig になる
        // when (操作):
        let result = Command::parse("start-session 25 five 4");

        // then (期待する結果):
        assert_eq!(
            result,
            Err(CommandError::Session(SessionError::InvalidConfig(
                "'five' is not a whole number".to_string()
            )))
        );
    }

    #[test]
    fn test_join_audio_channel_is_optional() {
        // テスト項目: join-audio のチャンネル指定は省略できる
        // when (操作):
        let without = Command::parse("join-audio").unwrap();
        let with = Command::parse("join-audio voice-1").unwrap();

        // then (期待する結果):
        assert_eq!(without, Command::JoinAudio { channel_id: None });
        assert_eq!(
            with,
            Command::JoinAudio {
                channel_id: Some(ChannelId::new("voice-1".to_string()).unwrap()),
            }
        );
    }

    #[test]
    fn test_preset_save_requires_four_arguments() {
        // テスト項目: preset-save は引数 4 つが必要
        // when (操作):
        let short = Command::parse("preset-save deep 50 10");
        let full = Command::parse("preset-save deep 50 10 2").unwrap();

        // then (期待する結果):
        assert_eq!(short, Err(CommandError::Usage(PRESET_SAVE_USAGE)));
        assert_eq!(
            full,
            Command::PresetSave {
                name: PresetName::new("deep".to_string()).unwrap(),
                config: SessionConfig::new(50, 10, 2).unwrap(),
            }
        );
    }

    #[test]
    fn test_unknown_and_empty_lines() {
        // テスト項目: 未知のコマンドと空行は UnknownCommand になる
        // when (操作):
        let unknown = Command::parse("dance now");
        let empty = Command::parse("   ");

        // then (期待する結果):
        assert_eq!(unknown, Err(CommandError::UnknownCommand("dance".to_string())));
        assert_eq!(empty, Err(CommandError::UnknownCommand(String::new())));
    }

    #[test]
    fn test_extra_whitespace_is_ignored() {
        // テスト項目: 余分な空白は無視される
        // when (操作):
        let command = Command::parse("  pause  ").unwrap();

        // then (期待する結果):
        assert_eq!(command, Command::Pause);
    }
}
