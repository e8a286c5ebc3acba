//! UseCase: 共有タイマー更新処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - UpdateTimerUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - タイマーを変更できるのはオーナーだけであることを保証する
//! - オーナー以外の更新は本人にだけ not_owner エラーが返り、他の参加者には何も届かないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：オーナーによる開始・一時停止
//! - 異常系：オーナー以外による更新

use std::sync::Arc;

use crate::domain::{
    DomainError, MessagePusher, Notification, RepositoryError, RoomId, RoomRepository, SessionId,
    TimerState, Username, notification::error_code,
};

use super::error::UpdateTimerError;

/// タイマー更新のユースケース
pub struct UpdateTimerUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl UpdateTimerUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// タイマー更新を実行
    ///
    /// # Arguments
    ///
    /// * `session_id` - 送信元の接続（エラー通知の宛先）
    /// * `by` - 送信元のユーザー名
    /// * `timer` - 新しいタイマー状態（そのまま置き換える）
    pub async fn execute(
        &self,
        room_id: &RoomId,
        session_id: &SessionId,
        by: &Username,
        timer: TimerState,
    ) -> Result<TimerState, UpdateTimerError> {
        // 保存順と配信順を揃える
        let _guard = self.repository.lock_room(room_id).await;

        let timer = match self.repository.update_timer(room_id, by, timer).await {
            Ok(timer) => timer,
            Err(RepositoryError::Domain(DomainError::NotOwner(name))) => {
                tracing::info!("Rejected timer update from non-owner '{}'", name);
                let notification = Notification::Error {
                    code: error_code::NOT_OWNER,
                    message: "only the room owner can control the timer".to_string(),
                };
                if let Err(e) = self.message_pusher.push_to(session_id, &notification).await {
                    tracing::warn!("Failed to send error to '{}': {}", session_id, e);
                }
                return Err(UpdateTimerError::NotOwner(name));
            }
            Err(_) => return Err(UpdateTimerError::RoomNotFound(room_id.as_str().to_string())),
        };

        let room = self
            .repository
            .get_room(room_id)
            .await
            .map_err(|_| UpdateTimerError::RoomNotFound(room_id.as_str().to_string()))?;
        self.message_pusher
            .broadcast(room.session_ids(), &Notification::TimerUpdate(timer))
            .await
            .map_err(|e| UpdateTimerError::BroadcastFailed(e.to_string()))?;

        Ok(timer)
    }
}
