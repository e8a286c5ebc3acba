//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::TimerStateDto;

/// Entry of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub owner: Option<String>,
    pub participants: Vec<String>,
    pub created_at: String,
}

/// Body of `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub owner: Option<String>,
    pub participants: Vec<ParticipantDetailDto>,
    pub timer: TimerStateDto,
    pub message_count: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDetailDto {
    pub username: String,
    pub session_id: String,
    pub connected_at: String,
}
