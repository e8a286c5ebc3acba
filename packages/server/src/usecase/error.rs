//! UseCase error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("session '{0}' is already connected")]
    DuplicateSession(String),

    #[error("room capacity exceeded")]
    RoomCapacityExceeded,

    #[error("repository error: {0}")]
    Repository(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectError {
    #[error("session '{0}' is not connected")]
    NotConnected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateTimerError {
    #[error("'{0}' is not the room owner")]
    NotOwner(String),

    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelaySignalError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("peer '{0}' is not in the room")]
    PeerNotFound(String),

    #[error("relay failed: {0}")]
    PushFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("room not found")]
    RoomNotFound,

    #[error("invalid room id")]
    InvalidRoomId,
}
