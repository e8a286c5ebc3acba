//! Outbound notifications
//!
//! UseCase 層がクライアントへ送りたい内容をドメインの言葉で表現します。
//! ワイヤ形式（JSON）への変換は Infrastructure 層（DTO）が担当します。

use serde_json::Value;

use super::{
    entity::{ChatMessage, TimerState},
    value_object::Username,
};

/// WebRTC signaling message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// Error codes sent to a single client in an `error` frame
pub mod error_code {
    pub const NOT_OWNER: &str = "not_owner";
    pub const INVALID_PAYLOAD: &str = "invalid_payload";
    pub const PEER_NOT_FOUND: &str = "peer_not_found";
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Full roster snapshot
    UserList {
        users: Vec<Username>,
        owner: Option<Username>,
    },
    TimerUpdate(TimerState),
    /// History replay sent once to a newly joined connection
    ChatHistory(Vec<ChatMessage>),
    ChatMessage(ChatMessage),
    /// Relayed WebRTC handshake payload (SDP or ICE candidate, opaque)
    Signal {
        kind: SignalKind,
        payload: Value,
        to: Username,
        from: Username,
    },
    Error {
        code: &'static str,
        message: String,
    },
}
