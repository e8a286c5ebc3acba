//! MessagePusher trait 定義
//!
//! 接続中のクライアントへ通知を届けるためのインターフェース。
//! 具体的な実装（WebSocket）は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError, notification::Notification, value_object::SessionId,
};

/// Per-connection outbound channel carrying encoded frames
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録
    async fn register_client(&self, session_id: SessionId, sender: PusherChannel);

    /// 接続の登録を解除
    async fn unregister_client(&self, session_id: &SessionId);

    /// 特定の接続へ通知
    async fn push_to(
        &self,
        session_id: &SessionId,
        notification: &Notification,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続へ通知（一部の失敗は許容）
    async fn broadcast(
        &self,
        targets: Vec<SessionId>,
        notification: &Notification,
    ) -> Result<(), MessagePushError>;
}
