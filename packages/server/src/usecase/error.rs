//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{SessionError, ValueObjectError, VoiceError};

/// Errors returned to the user for a command.
///
/// Every variant leaves session and connection state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("join a voice channel with join-audio first")]
    NotJoined,

    #[error("preset '{0}' not found")]
    PresetNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

impl CommandError {
    /// Machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Session(SessionError::InvalidConfig(_)) => "invalid-config",
            CommandError::Session(SessionError::AlreadyActive) => "already-active",
            CommandError::Session(SessionError::NotRunning) => "not-running",
            CommandError::Session(SessionError::NotPaused) => "not-paused",
            CommandError::Session(SessionError::NotFound) => "no-session",
            CommandError::Voice(VoiceError::Unavailable) => "voice-unavailable",
            CommandError::Voice(VoiceError::NoTarget) => "no-voice-channel",
            CommandError::Voice(VoiceError::JoinFailed(_)) => "join-failed",
            CommandError::Voice(VoiceError::Timeout) => "voice-timeout",
            CommandError::Voice(VoiceError::Playback(_)) => "playback-failed",
            CommandError::NotJoined => "not-joined",
            CommandError::PresetNotFound(_) => "preset-not-found",
            CommandError::InvalidArgument(_) => "invalid-argument",
            CommandError::Usage(_) => "usage",
            CommandError::UnknownCommand(_) => "unknown-command",
        }
    }
}

impl From<ValueObjectError> for CommandError {
    fn from(error: ValueObjectError) -> Self {
        CommandError::InvalidArgument(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_keeps_message() {
        // テスト項目: SessionError のメッセージがそのまま表示される
        // given (前提条件):
        let error = CommandError::from(SessionError::AlreadyActive);

        // when (操作):
        let message = error.to_string();

        // then (期待する結果):
        assert_eq!(message, "a focus session is already running");
        assert_eq!(error.code(), "already-active");
    }

    #[test]
    fn test_value_object_error_becomes_invalid_argument() {
        // テスト項目: 値オブジェクトの検証エラーは InvalidArgument になる
        // given (前提条件):
        let error = ValueObjectError::Empty("preset name");

        // when (操作):
        let error = CommandError::from(error);

        // then (期待する結果):
        assert_eq!(
            error,
            CommandError::InvalidArgument("preset name must not be empty".to_string())
        );
    }
}
