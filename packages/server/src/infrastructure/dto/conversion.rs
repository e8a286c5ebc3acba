//! Conversion logic between DTOs and domain entities.

use studyroom_shared::time::timestamp_to_rfc3339;

use crate::domain::{ChatMessage, Notification, Participant, Room, SignalKind, TimerState};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::TimerStateDto> for TimerState {
    fn from(dto: dto::TimerStateDto) -> Self {
        Self {
            running: dto.running,
            remaining: dto.remaining,
            start_time: dto.start_time,
        }
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<TimerState> for dto::TimerStateDto {
    fn from(model: TimerState) -> Self {
        Self {
            running: model.running,
            remaining: model.remaining,
            start_time: model.start_time,
        }
    }
}

impl From<&ChatMessage> for dto::ChatMessageDto {
    fn from(model: &ChatMessage) -> Self {
        Self {
            username: model.from.as_str().to_string(),
            message: model.content.as_str().to_string(),
            timestamp: Some(model.timestamp.value()),
        }
    }
}

impl From<&Notification> for dto::ServerMessage {
    fn from(notification: &Notification) -> Self {
        match notification {
            Notification::UserList { users, owner } => Self::UserList {
                users: users.iter().map(|u| u.as_str().to_string()).collect(),
                owner: owner.as_ref().map(|o| o.as_str().to_string()),
            },
            Notification::TimerUpdate(timer) => Self::TimerUpdate {
                data: (*timer).into(),
            },
            Notification::ChatHistory(messages) => Self::ChatHistory {
                messages: messages.iter().map(dto::ChatMessageDto::from).collect(),
            },
            Notification::ChatMessage(message) => Self::ChatMessage {
                username: message.from.as_str().to_string(),
                message: message.content.as_str().to_string(),
                timestamp: Some(message.timestamp.value()),
            },
            Notification::Signal {
                kind,
                payload,
                to,
                from,
            } => {
                let to = to.as_str().to_string();
                let from = from.as_str().to_string();
                let payload = payload.clone();
                match kind {
                    SignalKind::Offer => Self::WebrtcOffer {
                        sdp: payload,
                        to,
                        from,
                    },
                    SignalKind::Answer => Self::WebrtcAnswer {
                        sdp: payload,
                        to,
                        from,
                    },
                    SignalKind::IceCandidate => Self::WebrtcIce {
                        candidate: payload,
                        to,
                        from,
                    },
                }
            }
            Notification::Error { code, message } => Self::Error {
                code: (*code).to_string(),
                message: message.clone(),
            },
        }
    }
}

impl From<&Participant> for http::ParticipantDetailDto {
    fn from(model: &Participant) -> Self {
        Self {
            username: model.username.as_str().to_string(),
            session_id: model.session_id.as_str().to_string(),
            connected_at: timestamp_to_rfc3339(model.connected_at.value()),
        }
    }
}

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            owner: room.owner.as_ref().map(|o| o.as_str().to_string()),
            participants: room
                .usernames()
                .into_iter()
                .map(|u| u.into_string())
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Room> for http::RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            owner: room.owner.as_ref().map(|o| o.as_str().to_string()),
            participants: room
                .participants
                .iter()
                .map(http::ParticipantDetailDto::from)
                .collect(),
            timer: room.timer.into(),
            message_count: room.messages.len(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

/// Encode a notification as a JSON text frame.
pub fn encode_notification(notification: &Notification) -> Result<String, serde_json::Error> {
    serde_json::to_string(&dto::ServerMessage::from(notification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, RoomId, SessionId, Timestamp, Username};
    use serde_json::json;

    fn username(name: &str) -> Username {
        Username::new(name.to_string()).unwrap()
    }

    #[test]
    fn test_user_list_notification_to_json() {
        // テスト項目: user_list 通知が users / owner を持つ JSON になる
        // given (前提条件):
        let notification = Notification::UserList {
            users: vec![username("alice"), username("bob")],
            owner: Some(username("alice")),
        };

        // when (操作):
        let json = encode_notification(&notification).unwrap();

        // then (期待する結果):
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({"type": "user_list", "users": ["alice", "bob"], "owner": "alice"})
        );
    }

    #[test]
    fn test_timer_notification_to_json() {
        // テスト項目: タイマー通知が data に 3 つ組を持つ JSON になる
        // given (前提条件):
        let notification = Notification::TimerUpdate(TimerState {
            running: false,
            remaining: 300,
            start_time: None,
        });

        // when (操作):
        let json = encode_notification(&notification).unwrap();

        // then (期待する結果):
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({"type": "timer_update", "data": {"running": false, "remaining": 300, "start_time": null}})
        );
    }

    #[test]
    fn test_signal_notification_keeps_direction() {
        // テスト項目: シグナリング通知の種別と宛先・送信元が保持される
        // given (前提条件):
        let notification = Notification::Signal {
            kind: SignalKind::Answer,
            payload: json!({"type": "answer", "sdp": "v=0"}),
            to: username("alice"),
            from: username("bob"),
        };

        // when (操作):
        let message = dto::ServerMessage::from(&notification);

        // then (期待する結果):
        assert_eq!(
            message,
            dto::ServerMessage::WebrtcAnswer {
                sdp: json!({"type": "answer", "sdp": "v=0"}),
                to: "alice".to_string(),
                from: "bob".to_string(),
            }
        );
    }

    #[test]
    fn test_room_summary_lists_distinct_usernames() {
        // テスト項目: ルーム概要には重複しないユーザー名が並ぶ
        // given (前提条件):
        let mut room = Room::new(RoomId::new("math-1".to_string()).unwrap(), Timestamp::new(0));
        for (session, name) in [("tab-1", "alice"), ("tab-2", "alice"), ("tab-3", "bob")] {
            room.add_participant(Participant::new(
                SessionId::new(session.to_string()).unwrap(),
                username(name),
                Timestamp::new(0),
            ))
            .unwrap();
        }
        room.add_message(ChatMessage::new(
            username("bob"),
            MessageContent::new("hi".to_string()).unwrap(),
            Timestamp::new(5),
        ));

        // when (操作):
        let summary = http::RoomSummaryDto::from(&room);
        let detail = http::RoomDetailDto::from(&room);

        // then (期待する結果):
        assert_eq!(summary.participants, vec!["alice", "bob"]);
        assert_eq!(summary.owner.as_deref(), Some("alice"));
        assert_eq!(detail.participants.len(), 3);
        assert_eq!(detail.message_count, 1);
        assert_eq!(summary.created_at, "1970-01-01T00:00:00.000Z");
    }
}
