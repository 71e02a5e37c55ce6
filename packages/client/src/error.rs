//! Error types for the Focusbell client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The user already has a connection
    #[error("User '{0}' is already connected")]
    DuplicateUser(String),

    /// The server rejected the token
    #[error("The server rejected the token")]
    Unauthorized,

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl ClientError {
    /// Errors that reconnecting cannot fix
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::DuplicateUser(_) | ClientError::Unauthorized)
    }
}
