//! Domain error types.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be at most {1} characters")]
    TooLong(&'static str, usize),

    #[error("{0} must not contain whitespace")]
    ContainsWhitespace(&'static str),
}

/// Session state conflicts and input validation failures.
///
/// None of these change session state when returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("a focus session is already running")]
    AlreadyActive,

    #[error("the session is already paused")]
    NotRunning,

    #[error("the session is not paused")]
    NotPaused,

    #[error("no active session")]
    NotFound,
}

/// Voice connection errors surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("voice notifications are unavailable")]
    Unavailable,

    #[error("join a voice channel first")]
    NoTarget,

    #[error("failed to join voice channel: {0}")]
    JoinFailed(String),

    #[error("timed out waiting for the voice connection")]
    Timeout,

    #[error("playback failed: {0}")]
    Playback(String),
}

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("user '{0}' already has an active session")]
    AlreadyExists(String),
}

/// Client push errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client '{0}' is not connected")]
    ClientNotFound(String),

    #[error("client '{0}' is already connected")]
    AlreadyRegistered(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
