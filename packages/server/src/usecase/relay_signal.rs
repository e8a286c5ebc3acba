//! UseCase: WebRTC シグナリング中継処理
//!
//! offer / answer / ice の各ペイロードは中身を解釈せず、宛先ユーザーの全接続へ転送します。
//! `from` は常に送信元接続のユーザー名で上書きします。
//!
//! 宛先はユーザー名でしか指定できないため、同じ名前で複数タブを開いている場合は
//! 全タブに同じシグナルが届きます。メッシュ接続が成立するのは 1 ユーザー 1 タブの場合だけです。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelaySignalUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 宛先ユーザーにだけシグナルが届き、他の参加者には届かないことを保証する
//! - 送信元を偽装できないこと（from の上書き）を保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：offer の中継
//! - 異常系：ルームにいないユーザー宛てのシグナル

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{
    MessagePusher, Notification, RoomId, RoomRepository, SessionId, SignalKind, Username,
    notification::error_code,
};

use super::error::RelaySignalError;

/// シグナリング中継のユースケース
pub struct RelaySignalUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelaySignalUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// シグナル中継を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SessionId>)` - 転送先のセッション
    /// * `Err(RelaySignalError)` - 宛先が存在しない等
    pub async fn execute(
        &self,
        room_id: &RoomId,
        session_id: &SessionId,
        from: Username,
        to: Username,
        kind: SignalKind,
        payload: Value,
    ) -> Result<Vec<SessionId>, RelaySignalError> {
        let room = self
            .repository
            .get_room(room_id)
            .await
            .map_err(|_| RelaySignalError::RoomNotFound(room_id.as_str().to_string()))?;

        let targets = room.sessions_of(&to);
        if targets.is_empty() {
            tracing::debug!("Dropping {:?} from '{}': '{}' is not in the room", kind, from, to);
            let notification = Notification::Error {
                code: error_code::PEER_NOT_FOUND,
                message: format!("'{}' is not in the room", to),
            };
            if let Err(e) = self.message_pusher.push_to(session_id, &notification).await {
                tracing::warn!("Failed to send error to '{}': {}", session_id, e);
            }
            return Err(RelaySignalError::PeerNotFound(to.into_string()));
        }

        let notification = Notification::Signal {
            kind,
            payload,
            to,
            from,
        };
        self.message_pusher
            .broadcast(targets.clone(), &notification)
            .await
            .map_err(|e| RelaySignalError::PushFailed(e.to_string()))?;

        Ok(targets)
    }
}
