//! Domain layer
//!
//! Room の状態遷移（参加・退出・オーナー委譲・タイマー・チャット履歴）と、
//! UseCase 層が依存するインターフェース（Repository, MessagePusher）を定義します。

pub mod entity;
pub mod error;
pub mod factory;
pub mod notification;
pub mod pusher;
pub mod repository;
pub mod value_object;

pub use entity::{ChatMessage, Participant, Room, TimerState};
pub use error::{DomainError, MessagePushError, RepositoryError, ValueObjectError};
pub use factory::SessionIdFactory;
pub use notification::{Notification, SignalKind};
pub use pusher::{MessagePusher, PusherChannel};
pub use repository::{RoomGuard, RoomRepository};
pub use value_object::{MessageContent, RoomId, SessionId, Timestamp, Username};
