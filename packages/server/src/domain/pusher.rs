//! MessagePusher trait 定義
//!
//! セッションイベントを接続中のクライアントへ届けるためのインターフェース。
//! シリアライズ形式と送信手段は Infrastructure 層が決めます。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{MessagePushError, SessionEvent, UserId};

/// Outbound channel of one connected client
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Register a client. A user may only have one connection at a time.
    async fn register_client(
        &self,
        user_id: UserId,
        sender: PusherChannel,
    ) -> Result<(), MessagePushError>;

    /// Unregister the client, but only if `sender` is still the registered
    /// channel or the registered one is closed. A newer connection of the
    /// same user stays registered.
    async fn unregister_client(&self, user_id: &UserId, sender: &PusherChannel);

    /// Push a session event to its owner
    async fn push_event(&self, event: &SessionEvent) -> Result<(), MessagePushError>;
}
