//! Domain entities
//!
//! `Room` は 1 つの学習ルームの状態（参加者、オーナー、共有タイマー、チャット履歴）を保持し、
//! 状態遷移のルールをすべて自身のメソッドとして持ちます。

use std::collections::VecDeque;

use serde::Serialize;

use super::{
    error::DomainError,
    value_object::{MessageContent, RoomId, SessionId, Timestamp, Username},
};

/// Default Pomodoro length in seconds (25 minutes)
pub const DEFAULT_TIMER_SECONDS: u32 = 1500;
/// Default maximum number of simultaneous connections per room
pub const DEFAULT_PARTICIPANT_CAPACITY: usize = 16;
/// Default number of chat messages kept for replay on join
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One live connection (one browser tab) in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub session_id: SessionId,
    pub username: Username,
    pub connected_at: Timestamp,
}

impl Participant {
    pub fn new(session_id: SessionId, username: Username, connected_at: Timestamp) -> Self {
        Self {
            session_id,
            username,
            connected_at,
        }
    }
}

/// A chat line as stored in the room history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub from: Username,
    pub content: MessageContent,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    pub fn new(from: Username, content: MessageContent, timestamp: Timestamp) -> Self {
        Self {
            from,
            content,
            timestamp,
        }
    }
}

/// Shared countdown state, replaced wholesale by the owner's updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerState {
    pub running: bool,
    pub remaining: u32,
    pub start_time: Option<i64>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            running: false,
            remaining: DEFAULT_TIMER_SECONDS,
            start_time: None,
        }
    }
}

/// A study room
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub created_at: Timestamp,
    /// Connections in join order
    pub participants: Vec<Participant>,
    pub owner: Option<Username>,
    pub timer: TimerState,
    pub messages: VecDeque<ChatMessage>,
    #[serde(skip)]
    participant_capacity: usize,
    #[serde(skip)]
    history_capacity: usize,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self::with_capacity(
            id,
            created_at,
            DEFAULT_PARTICIPANT_CAPACITY,
            DEFAULT_HISTORY_CAPACITY,
        )
    }

    pub fn with_capacity(
        id: RoomId,
        created_at: Timestamp,
        participant_capacity: usize,
        history_capacity: usize,
    ) -> Self {
        Self {
            id,
            created_at,
            participants: Vec::new(),
            owner: None,
            timer: TimerState::default(),
            messages: VecDeque::new(),
            participant_capacity,
            history_capacity,
        }
    }

    /// Add a connection. The first participant of a room becomes its owner.
    pub fn add_participant(&mut self, participant: Participant) -> Result<(), DomainError> {
        if self
            .participants
            .iter()
            .any(|p| p.session_id == participant.session_id)
        {
            return Err(DomainError::DuplicateSession(
                participant.session_id.into_string(),
            ));
        }
        if self.participants.len() >= self.participant_capacity {
            return Err(DomainError::RoomCapacityExceeded(self.participant_capacity));
        }

        if self.owner.is_none() {
            self.owner = Some(participant.username.clone());
        }
        self.participants.push(participant);
        Ok(())
    }

    /// Remove a connection.
    ///
    /// When the owner's last connection leaves, ownership passes to the
    /// earliest-joined remaining participant.
    pub fn remove_participant(&mut self, session_id: &SessionId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.session_id == session_id)?;
        let removed = self.participants.remove(index);

        let owner_left = self.owner.as_ref() == Some(&removed.username)
            && !self
                .participants
                .iter()
                .any(|p| p.username == removed.username);
        if owner_left {
            self.owner = self.participants.first().map(|p| p.username.clone());
        }

        Some(removed)
    }

    /// Distinct usernames in join order
    pub fn usernames(&self) -> Vec<Username> {
        let mut names: Vec<Username> = Vec::with_capacity(self.participants.len());
        for participant in &self.participants {
            if !names.contains(&participant.username) {
                names.push(participant.username.clone());
            }
        }
        names
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.participants
            .iter()
            .map(|p| p.session_id.clone())
            .collect()
    }

    /// Sessions belonging to `username` (one user may have several tabs open)
    pub fn sessions_of(&self, username: &Username) -> Vec<SessionId> {
        self.participants
            .iter()
            .filter(|p| &p.username == username)
            .map(|p| p.session_id.clone())
            .collect()
    }

    pub fn is_owner(&self, username: &Username) -> bool {
        self.owner.as_ref() == Some(username)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Replace the shared timer. Only the owner may do so.
    pub fn update_timer(
        &mut self,
        by: &Username,
        timer: TimerState,
    ) -> Result<TimerState, DomainError> {
        if !self.is_owner(by) {
            return Err(DomainError::NotOwner(by.as_str().to_string()));
        }
        self.timer = timer;
        Ok(self.timer)
    }

    /// Append a chat message; the oldest entry is dropped beyond capacity.
    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.history_capacity {
            self.messages.pop_front();
        }
    }
}
