//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 参加処理（重複セッションの拒否、定員、オーナー決定）と参加直後の通知
//!
//! ### なぜこのテストが必要か
//! - 1 タブ = 1 接続の前提（同じ sessionId の二重接続を拒否）を保証する
//! - 参加直後に user_list → chat_history → timer_update の順で届くことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加者の接続と全員への名簿配信
//! - 異常系：重複した sessionId での接続試行
//! - エッジケース：ルームの定員超過

use std::sync::Arc;

use studyroom_shared::time::{Clock, SystemClock};

use crate::domain::{
    DomainError, MessagePusher, Notification, Participant, PusherChannel, RepositoryError, RoomId,
    RoomRepository, SessionId, Timestamp, Username,
};

use super::{broadcast_user_list, error::ConnectError};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
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

    /// 参加者接続を実行
    ///
    /// 成功すると、ルーム全員へ `user_list` を配信し、新規参加者にだけ
    /// `chat_history` と `timer_update` を送ります。配信はルームの排他の中で
    /// 行うため、最後に届く名簿は常に最新の名簿です。送信は sender のキューに
    /// 積まれるため、WebSocket のアップグレード前に呼び出しても順序は保たれます。
    ///
    /// # Returns
    ///
    /// * `Ok(Timestamp)` - 接続成功（接続時刻）
    /// * `Err(ConnectError)` - 接続失敗
    pub async fn execute(
        &self,
        room_id: RoomId,
        session_id: SessionId,
        username: Username,
        sender: PusherChannel,
    ) -> Result<Timestamp, ConnectError> {
        let connected_at = Timestamp::new(self.clock.now_millis());
        let participant = Participant::new(session_id.clone(), username, connected_at);

        // 参加・登録・配信を終えるまで同じルームの他の更新を待たせる
        let _guard = self.repository.lock_room(&room_id).await;

        // 1. Repository に参加者を追加（ルームが無ければ作成）
        let room = self
            .repository
            .join(&room_id, participant)
            .await
            .map_err(|e| match e {
                RepositoryError::Domain(DomainError::DuplicateSession(id)) => {
                    ConnectError::DuplicateSession(id)
                }
                RepositoryError::Domain(DomainError::RoomCapacityExceeded(_)) => {
                    ConnectError::RoomCapacityExceeded
                }
                other => ConnectError::Repository(other.to_string()),
            })?;

        // 2. MessagePusher に接続を登録
        self.message_pusher
            .register_client(session_id.clone(), sender)
            .await;

        // 3. 全員へ名簿を配信
        broadcast_user_list(self.message_pusher.as_ref(), &room).await;

        // 4. 新規参加者へ履歴とタイマーを送信
        let history = Notification::ChatHistory(room.messages.iter().cloned().collect());
        let timer = Notification::TimerUpdate(room.timer);
        for notification in [history, timer] {
            if let Err(e) = self.message_pusher.push_to(&session_id, &notification).await {
                tracing::warn!("Failed to send initial state to '{}': {}", session_id, e);
            }
        }

        Ok(connected_at)
    }
}
