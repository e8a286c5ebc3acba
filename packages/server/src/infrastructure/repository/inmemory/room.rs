//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! ルーム ID をキーにした HashMap をインメモリ DB として使用します。
//! ルームは最初の参加時に作成され、最後の参加者の退出時に削除されます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use studyroom_shared::time::{Clock, SystemClock};
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, Participant, RepositoryError, Room, RoomGuard, RoomId, RoomRepository, SessionId,
    TimerState, Timestamp, Username,
    entity::{DEFAULT_HISTORY_CAPACITY, DEFAULT_PARTICIPANT_CAPACITY},
};

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    /// Key: room_id
    rooms: Mutex<HashMap<String, Room>>,
    /// Key: room_id
    room_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    participant_capacity: usize,
    history_capacity: usize,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PARTICIPANT_CAPACITY, DEFAULT_HISTORY_CAPACITY)
    }

    /// 新しく作成されるルームの定員・履歴件数を指定して作成
    pub fn with_capacity(participant_capacity: usize, history_capacity: usize) -> Self {
        Self::with_clock(participant_capacity, history_capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(
        participant_capacity: usize,
        history_capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            room_locks: Mutex::new(HashMap::new()),
            participant_capacity,
            history_capacity,
            clock,
        }
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn lock_room(&self, room_id: &RoomId) -> RoomGuard {
        let lock = {
            let mut locks = self.room_locks.lock().await;
            // 誰も保持・待機していないロックは片付ける
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(room_id.as_str().to_string())
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    async fn join(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let created_now = !rooms.contains_key(room_id.as_str());
        let room = rooms
            .entry(room_id.as_str().to_string())
            .or_insert_with(|| {
                Room::with_capacity(
                    room_id.clone(),
                    Timestamp::new(self.clock.now_millis()),
                    self.participant_capacity,
                    self.history_capacity,
                )
            });

        if let Err(e) = room.add_participant(participant) {
            // 作成直後のルームに参加できなかった場合は空のルームを残さない
            if created_now {
                rooms.remove(room_id.as_str());
            }
            return Err(e.into());
        }
        if created_now {
            tracing::info!("Room '{}' created", room_id);
        }

        Ok(room.clone())
    }

    async fn leave(
        &self,
        room_id: &RoomId,
        session_id: &SessionId,
    ) -> Result<Option<Room>, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id.as_str())
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;

        if room.remove_participant(session_id).is_none() {
            return Err(crate::domain::DomainError::ParticipantNotFound(
                session_id.as_str().to_string(),
            )
            .into());
        }

        if room.is_empty() {
            rooms.remove(room_id.as_str());
            tracing::info!("Room '{}' is empty and has been removed", room_id);
            return Ok(None);
        }

        Ok(Some(room.clone()))
    }

    async fn update_timer(
        &self,
        room_id: &RoomId,
        by: &Username,
        timer: TimerState,
    ) -> Result<TimerState, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id.as_str())
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
        Ok(room.update_timer(by, timer)?)
    }

    async fn add_message(
        &self,
        room_id: &RoomId,
        message: ChatMessage,
    ) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id.as_str())
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
        room.add_message(message);
        Ok(())
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id.as_str())
            .cloned()
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))
    }

    async fn get_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        list
    }
}
