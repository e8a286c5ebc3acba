//! UseCase layer
//!
//! 1 つのユースケース = 1 つの構造体。Repository で状態を更新し、
//! MessagePusher で結果を接続中のクライアントへ通知します。

mod connect_participant;
mod disconnect_participant;
mod error;
#[cfg(test)]
mod gated_pusher;
mod get_room_detail;
mod get_rooms;
mod relay_signal;
mod send_message;
mod update_timer;

pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{
    ConnectError, DisconnectError, GetRoomDetailError, RelaySignalError, SendMessageError,
    UpdateTimerError,
};
pub use get_room_detail::GetRoomDetailUseCase;
pub use get_rooms::GetRoomsUseCase;
pub use relay_signal::RelaySignalUseCase;
pub use send_message::SendMessageUseCase;
pub use update_timer::UpdateTimerUseCase;

use crate::domain::{MessagePusher, Notification, Room};

/// ルームの全接続へ最新の名簿を送る
async fn broadcast_user_list(message_pusher: &dyn MessagePusher, room: &Room) {
    let roster = Notification::UserList {
        users: room.usernames(),
        owner: room.owner.clone(),
    };
    if let Err(e) = message_pusher.broadcast(room.session_ids(), &roster).await {
        tracing::warn!("Failed to broadcast user_list for room '{}': {}", room.id, e);
    }
}
