//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 退室後の名簿が残りの参加者全員に届くことを保証する
//! - オーナーが退室した場合に次の参加者へオーナーが移ることを保証する
//! - 最後の参加者の退室でルームが削除されることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の退室と名簿の再配信
//! - 異常系：接続していないセッションの切断
//! - エッジケース：最後の 1 人の退室

use std::sync::Arc;

use crate::domain::{MessagePusher, RoomId, RoomRepository, SessionId};

use super::{broadcast_user_list, error::DisconnectError};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SessionId>)` - 新しい名簿を受け取ったセッション（ルームが削除された場合は空）
    /// * `Err(DisconnectError)` - 対象のセッションが存在しない
    pub async fn execute(
        &self,
        room_id: &RoomId,
        session_id: &SessionId,
    ) -> Result<Vec<SessionId>, DisconnectError> {
        let _guard = self.repository.lock_room(room_id).await;

        // 1. 送信先から先に外す
        self.message_pusher.unregister_client(session_id).await;

        // 2. Repository から参加者を削除
        let remaining = self
            .repository
            .leave(room_id, session_id)
            .await
            .map_err(|_| DisconnectError::NotConnected(session_id.as_str().to_string()))?;

        // 3. 残りの参加者に名簿を配信
        match remaining {
            Some(room) => {
                broadcast_user_list(self.message_pusher.as_ref(), &room).await;
                Ok(room.session_ids())
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Participant, Timestamp, Username, pusher::MockMessagePusher},
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        },
    };
    use tokio::sync::mpsc;

    fn room_id() -> RoomId {
        RoomId::new("math-1".to_string()).unwrap()
    }

    fn session(id: &str) -> SessionId {
        SessionId::new(id.to_string()).unwrap()
    }

    async fn join(
        repository: &InMemoryRoomRepository,
        pusher: &WebSocketMessagePusher,
        id: &str,
        name: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        repository
            .join(
                &room_id(),
                Participant::new(
                    session(id),
                    Username::new(name.to_string()).unwrap(),
                    Timestamp::new(0),
                ),
            )
            .await
            .unwrap();
        pusher.register_client(session(id), tx).await;
        rx
    }

    #[tokio::test]
    async fn test_disconnect_participant_success() {
        // テスト項目: 退室すると残りの参加者に新しい名簿が届く
        // given (前提条件):
        let repository = Arc::new(InMemoryRoomRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::default());
        let _rx1 = join(&repository, &pusher, "tab-1", "alice").await;
        let mut rx2 = join(&repository, &pusher, "tab-2", "bob").await;
        let usecase = DisconnectParticipantUseCase::new(repository.clone(), pusher.clone());

        // when (操作):
        let result = usecase.execute(&room_id(), &session("tab-1")).await;

        // then (期待する結果):
        assert_eq!(result, Ok(vec![session("tab-2")]));
        let frame: serde_json::Value = serde_json::from_str(&rx2.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "user_list");
        assert_eq!(frame["users"], serde_json::json!(["bob"]));
        // オーナーは次の参加者へ移る
        assert_eq!(frame["owner"], "bob");
    }

    #[tokio::test]
    async fn test_last_participant_removes_room() {
        // テスト項目: 最後の参加者が退室するとルームが削除される
        // given (前提条件):
        let repository = Arc::new(InMemoryRoomRepository::new());
        let mut pusher = MockMessagePusher::new();
        pusher.expect_unregister_client().times(1).returning(|_| ());
        pusher.expect_broadcast().never();
        repository
            .join(
                &room_id(),
                Participant::new(
                    session("tab-1"),
                    Username::new("alice".to_string()).unwrap(),
                    Timestamp::new(0),
                ),
            )
            .await
            .unwrap();
        let usecase = DisconnectParticipantUseCase::new(repository.clone(), Arc::new(pusher));

        // when (操作):
        let result = usecase.execute(&room_id(), &session("tab-1")).await;

        // then (期待する結果):
        assert_eq!(result, Ok(Vec::new()));
        assert!(repository.get_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_unknown_session() {
        // テスト項目: 接続していないセッションの切断はエラーになる
        // given (前提条件):
        let repository = Arc::new(InMemoryRoomRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::default());
        let usecase = DisconnectParticipantUseCase::new(repository, pusher);

        // when (操作):
        let result = usecase.execute(&room_id(), &session("ghost")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DisconnectError::NotConnected("ghost".to_string()))
        );
    }
}
