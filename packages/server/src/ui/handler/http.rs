//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    infrastructure::dto::{
        http::{SessionListDto, VoiceConnectionDto},
        websocket::SessionSnapshotDto,
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// List active sessions
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListDto> {
    let snapshots = state.orchestrator.active_sessions().await;

    // Domain Model から DTO への変換
    let sessions: Vec<SessionSnapshotDto> = snapshots.iter().map(Into::into).collect();

    Json(SessionListDto {
        count: sessions.len(),
        sessions,
    })
}

/// List voice connections and their status
pub async fn get_voice_connections(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<VoiceConnectionDto>> {
    let connections = state
        .orchestrator
        .voice_connections()
        .into_iter()
        .map(|(scope_id, status)| VoiceConnectionDto {
            scope_id: scope_id.into_string(),
            status: status.as_str().to_string(),
        })
        .collect();
    Json(connections)
}
