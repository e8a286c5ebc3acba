//! UseCase: チャットメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 送信者を含む全員にメッセージが届くことを保証する（クライアントはエコーで自分の発言を表示する）
//! - 送信者名とタイムスタンプがサーバー側で付与されることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者のメッセージ送信
//! - 異常系：存在しないルームへの送信

use std::sync::Arc;

use studyroom_shared::time::{Clock, SystemClock};

use crate::domain::{
    ChatMessage, MessageContent, MessagePusher, Notification, RoomId, RoomRepository, SessionId,
    Timestamp, Username,
};

use super::error::SendMessageError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self::with_clock(repository, message_pusher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `from` - 接続に紐づくユーザー名（ペイロード内の username は使わない）
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SessionId>)` - 配信先のセッション
    /// * `Err(SendMessageError)` - 送信失敗
    pub async fn execute(
        &self,
        room_id: &RoomId,
        from: Username,
        content: MessageContent,
    ) -> Result<Vec<SessionId>, SendMessageError> {
        let message = ChatMessage::new(from, content, Timestamp::new(self.clock.now_millis()));

        let _guard = self.repository.lock_room(room_id).await;

        // 1. 履歴に追加
        self.repository
            .add_message(room_id, message.clone())
            .await
            .map_err(|_| SendMessageError::RoomNotFound(room_id.as_str().to_string()))?;

        // 2. 送信者を含む全員に配信
        let room = self
            .repository
            .get_room(room_id)
            .await
            .map_err(|_| SendMessageError::RoomNotFound(room_id.as_str().to_string()))?;
        let targets = room.session_ids();
        self.message_pusher
            .broadcast(targets.clone(), &Notification::ChatMessage(message))
            .await
            .map_err(|e| SendMessageError::BroadcastFailed(e.to_string()))?;

        Ok(targets)
    }
}
