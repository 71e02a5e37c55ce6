//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - ユーザーごとの WebSocket `UnboundedSender` を管理
//! - セッションイベントを JSON にシリアライズしてセッションの持ち主へ送信
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、送信にのみ使用します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{MessagePushError, MessagePusher, PusherChannel, SessionEvent, UserId},
    infrastructure::dto::websocket::ServerMessage,
};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new(Arc::new(Mutex::new(HashMap::new())));
/// pusher.register_client(user_id, tx).await?;
/// pusher.push_event(&event).await?;
/// ```
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの WebSocket sender
    ///
    /// Key: user_id
    /// Value: PusherChannel
    clients: Arc<Mutex<HashMap<UserId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new(clients: Arc<Mutex<HashMap<UserId, PusherChannel>>>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(
        &self,
        user_id: UserId,
        sender: PusherChannel,
    ) -> Result<(), MessagePushError> {
        let mut clients = self.clients.lock().await;
        // a closed sender belongs to a connection that is going away
        if clients.get(&user_id).is_some_and(|existing| !existing.is_closed()) {
            return Err(MessagePushError::AlreadyRegistered(user_id.into_string()));
        }
        tracing::debug!("Client '{}' registered to MessagePusher", user_id);
        clients.insert(user_id, sender);
        Ok(())
    }

    async fn unregister_client(&self, user_id: &UserId, sender: &PusherChannel) {
        let mut clients = self.clients.lock().await;
        let owned = clients
            .get(user_id)
            .is_some_and(|existing| existing.same_channel(sender) || existing.is_closed());
        if !owned {
            tracing::debug!("Client '{}' was re-registered, keeping the new channel", user_id);
            return;
        }
        clients.remove(user_id);
        tracing::debug!("Client '{}' unregistered from MessagePusher", user_id);
    }

    async fn push_event(&self, event: &SessionEvent) -> Result<(), MessagePushError> {
        let user_id = &event.snapshot.user_id;
        let clients = self.clients.lock().await;

        let Some(sender) = clients.get(user_id) else {
            return Err(MessagePushError::ClientNotFound(user_id.as_str().to_string()));
        };
        let message = ServerMessage::from(event);
        sender
            .send(message.to_json())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed {:?} to client '{}'", event.kind, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::{
        ChannelId, NextPhase, Phase, ScopeId, SessionConfig, SessionEventKind, SessionId,
        SessionSnapshot, Timestamp,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - イベントがセッションの持ち主にだけ送信されること
    // - 未接続ユーザーへの送信がエラーになること
    // - 同一ユーザーの二重接続が拒否されること
    // - 古い接続の登録解除が新しい接続を消さないこと
    // ========================================

    fn create_test_pusher() -> WebSocketMessagePusher {
        WebSocketMessagePusher::new(Arc::new(Mutex::new(HashMap::new())))
    }

    fn create_test_event(user: &str) -> SessionEvent {
        SessionEvent::new(
            SessionEventKind::Completed { total_cycles: 1 },
            SessionSnapshot {
                session_id: SessionId::generate(),
                user_id: UserId::new(user.to_string()).unwrap(),
                scope_id: ScopeId::new("guild-1".to_string()).unwrap(),
                channel_id: ChannelId::new("general".to_string()).unwrap(),
                config: SessionConfig::new(25, 5, 1).unwrap(),
                phase: Phase::Resting,
                paused: false,
                terminated: true,
                remaining: Duration::ZERO,
                current_cycle: 1,
                next_phase: NextPhase::Complete,
                notifications_enabled: false,
                started_at: Timestamp::new(0),
            },
        )
    }

    #[tokio::test]
    async fn test_push_event_to_owner() {
        // テスト項目: イベントがセッションの持ち主に JSON で送信される
        // given (前提条件):
        let pusher = create_test_pusher();
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        pusher
            .register_client(UserId::new("alice".to_string()).unwrap(), alice_tx)
            .await
            .unwrap();
        pusher
            .register_client(UserId::new("bob".to_string()).unwrap(), bob_tx)
            .await
            .unwrap();

        // when (操作):
        let result = pusher.push_event(&create_test_event("alice")).await;

        // then (期待する結果):
        assert!(result.is_ok());
        let received = alice_rx.recv().await.unwrap();
        assert!(received.contains(r#""type":"session-completed""#));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_push_event_client_not_found() {
        // テスト項目: 未接続ユーザーへの送信はエラーを返す
        // given (前提条件):
        let pusher = create_test_pusher();

        // when (操作):
        let result = pusher.push_event(&create_test_event("ghost")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MessagePushError::ClientNotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_client_rejected() {
        // テスト項目: 接続中のユーザーが再登録しようとするとエラーになる
        // given (前提条件):
        let pusher = create_test_pusher();
        let alice = UserId::new("alice".to_string()).unwrap();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        pusher.register_client(alice.clone(), tx1).await.unwrap();

        // when (操作):
        let result = pusher.register_client(alice, tx2).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MessagePushError::AlreadyRegistered("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_register_replaces_closed_client() {
        // テスト項目: 切断済み（受信側が破棄された）接続は再登録で置き換えられる
        // given (前提条件):
        let pusher = create_test_pusher();
        let alice = UserId::new("alice".to_string()).unwrap();
        let (tx1, rx1) = mpsc::unbounded_channel();
        pusher.register_client(alice.clone(), tx1).await.unwrap();
        drop(rx1);

        // when (操作):
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let result = pusher.register_client(alice, tx2).await;

        // then (期待する結果):
        assert!(result.is_ok());
        pusher.push_event(&create_test_event("alice")).await.unwrap();
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unregister_stale_sender_keeps_new_client() {
        // テスト項目: 置き換え済みの古い接続を登録解除しても、新しい接続は残りイベントを受け取る
        // given (前提条件):
        let pusher = create_test_pusher();
        let alice = UserId::new("alice".to_string()).unwrap();
        let (old_tx, old_rx) = mpsc::unbounded_channel();
        pusher.register_client(alice.clone(), old_tx.clone()).await.unwrap();
        drop(old_rx);
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        pusher.register_client(alice.clone(), new_tx).await.unwrap();

        // when (操作):
        pusher.unregister_client(&alice, &old_tx).await;

        // then (期待する結果):
        let result = pusher.push_event(&create_test_event("alice")).await;
        assert!(result.is_ok());
        assert!(new_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unregister_own_sender_removes_client() {
        // テスト項目: 自分の接続を登録解除すると、以降の送信は ClientNotFound になる
        // given (前提条件):
        let pusher = create_test_pusher();
        let alice = UserId::new("alice".to_string()).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        pusher.register_client(alice.clone(), tx.clone()).await.unwrap();

        // when (操作):
        pusher.unregister_client(&alice, &tx).await;

        // then (期待する結果):
        assert_eq!(
            pusher.push_event(&create_test_event("alice")).await,
            Err(MessagePushError::ClientNotFound("alice".to_string()))
        );
    }
}
