//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 参加・退出・タイマー更新はいずれも「読み取り → 検証 → 書き込み」を
//! 1 回のロック内で行う必要があるため、操作単位のメソッドとして定義しています。

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use super::{
    ChatMessage, Participant, RepositoryError, Room, RoomId, SessionId, TimerState, Username,
};

/// ルーム単位の排他ガード（drop で解放）
pub type RoomGuard = OwnedMutexGuard<()>;

/// Room Repository trait
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// ルーム単位の排他を取得
    ///
    /// 状態の更新とその結果の配信を同じガードの中で行うと、
    /// 配信の順序が更新の順序と一致します。
    async fn lock_room(&self, room_id: &RoomId) -> RoomGuard;

    /// 参加者を追加（ルームが無ければ作成）し、追加後のルームを返す
    async fn join(&self, room_id: &RoomId, participant: Participant)
    -> Result<Room, RepositoryError>;

    /// 参加者を削除し、残ったルームを返す
    ///
    /// 最後の参加者が抜けた場合はルームごと削除し、`Ok(None)` を返す
    async fn leave(
        &self,
        room_id: &RoomId,
        session_id: &SessionId,
    ) -> Result<Option<Room>, RepositoryError>;

    /// タイマーを更新（オーナーのみ）
    async fn update_timer(
        &self,
        room_id: &RoomId,
        by: &Username,
        timer: TimerState,
    ) -> Result<TimerState, RepositoryError>;

    /// メッセージを履歴に追加
    async fn add_message(
        &self,
        room_id: &RoomId,
        message: ChatMessage,
    ) -> Result<(), RepositoryError>;

    /// Room エンティティを取得
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 全ての Room を取得（作成順）
    async fn get_rooms(&self) -> Vec<Room>;
}
