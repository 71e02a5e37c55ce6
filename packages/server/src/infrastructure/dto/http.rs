//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::SessionSnapshotDto;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListDto {
    pub count: usize,
    pub sessions: Vec<SessionSnapshotDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceConnectionDto {
    pub scope_id: String,
    pub status: String,
}
