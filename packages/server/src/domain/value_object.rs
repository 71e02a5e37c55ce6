//! Value objects identifying users, scopes and sessions.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValueObjectError;

const MAX_ID_LEN: usize = 64;
const MAX_PRESET_NAME_LEN: usize = 32;

fn validate(kind: &'static str, value: &str, max_len: usize) -> Result<(), ValueObjectError> {
    if value.is_empty() {
        return Err(ValueObjectError::Empty(kind));
    }
    if value.chars().count() > max_len {
        return Err(ValueObjectError::TooLong(kind, max_len));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ValueObjectError::ContainsWhitespace(kind));
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                validate($kind, &value, $max)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Chat platform user identity
    UserId,
    "user_id",
    MAX_ID_LEN
);
string_id!(
    /// Grouping (server/guild) under which one voice connection is managed
    ScopeId,
    "scope_id",
    MAX_ID_LEN
);
string_id!(
    /// Text or voice channel identity
    ChannelId,
    "channel_id",
    MAX_ID_LEN
);
string_id!(
    /// Name of a user's saved session preset
    PresetName,
    "preset name",
    MAX_PRESET_NAME_LEN
);

/// Distinguishes successive sessions of the same user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
