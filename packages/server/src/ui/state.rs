//! Server state shared by the handlers.

use std::sync::Arc;

use crate::{domain::MessagePusher, usecase::SessionOrchestrator};

/// Shared application state
pub struct AppState {
    /// SessionOrchestrator（コマンド実行のユースケース）
    pub orchestrator: Arc<SessionOrchestrator>,
    /// MessagePusher（メッセージ通知の抽象化）
    pub message_pusher: Arc<dyn MessagePusher>,
    /// Shared secret clients present when connecting
    pub token: String,
}
