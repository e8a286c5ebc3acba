//! Error types for the study-room client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// This tab's session is already connected to the room
    #[error("Session '{0}' is already connected to this room")]
    DuplicateSession(String),

    /// The room refused the connection because it is full
    #[error("Room '{0}' is full")]
    RoomFull(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

/// Errors of the persisted session identity
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Failed to access identity store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Identity store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors of one peer connection or of local media acquisition
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("WebRTC error: {0}")]
    WebRtc(String),

    #[error("Invalid signaling payload: {0}")]
    InvalidPayload(String),

    #[error("Local media unavailable: {0}")]
    MediaUnavailable(String),
}

impl From<webrtc::Error> for PeerError {
    fn from(e: webrtc::Error) -> Self {
        Self::WebRtc(e.to_string())
    }
}

impl From<serde_json::Error> for PeerError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidPayload(e.to_string())
    }
}
