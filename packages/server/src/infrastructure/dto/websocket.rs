//! WebSocket frame DTOs.
//!
//! Every frame is a JSON object discriminated by its `type` field. Frames
//! with an unknown `type` decode to the `Unknown` variant so that either side
//! can ignore them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shared timer triple as carried in `timer_update.data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStateDto {
    pub running: bool,
    pub remaining: u32,
    #[serde(default)]
    pub start_time: Option<i64>,
}

/// One entry of `chat_history.messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub username: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Frames sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    UserJoin {
        username: String,
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "roomId")]
        room_id: String,
    },
    TimerUpdate {
        data: TimerStateDto,
    },
    ChatMessage {
        message: String,
        #[serde(default)]
        username: String,
    },
    WebrtcOffer {
        sdp: Value,
        to: String,
        #[serde(default)]
        from: String,
    },
    WebrtcAnswer {
        sdp: Value,
        to: String,
        #[serde(default)]
        from: String,
    },
    WebrtcIce {
        #[serde(default)]
        candidate: Value,
        to: String,
        #[serde(default)]
        from: String,
    },
    #[serde(other)]
    Unknown,
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    UserList {
        #[serde(default)]
        users: Vec<String>,
        #[serde(default)]
        owner: Option<String>,
    },
    TimerUpdate {
        data: TimerStateDto,
    },
    ChatHistory {
        #[serde(default)]
        messages: Vec<ChatMessageDto>,
    },
    ChatMessage {
        username: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    WebrtcOffer {
        sdp: Value,
        to: String,
        from: String,
    },
    WebrtcAnswer {
        sdp: Value,
        to: String,
        from: String,
    },
    WebrtcIce {
        #[serde(default)]
        candidate: Value,
        to: String,
        from: String,
    },
    Error {
        code: String,
        message: String,
    },
    #[serde(other)]
    Unknown,
}
