//! Room session: the client-side state machine of one joined room.
//!
//! Every inbound frame is routed to the reducer that owns it (presence, timer,
//! chat, mesh). Reducers treat each snapshot as the new truth. Outgoing frames
//! go through the [`Outbox`] and are dropped while disconnected.
//!
//! Methods return [`RoomEvent`]s for the rendering layer instead of printing.

use std::{collections::BTreeMap, sync::Arc};

use studyroom_server::infrastructure::dto::websocket::{
    ChatMessageDto, ClientMessage, ServerMessage, TimerStateDto,
};
use studyroom_shared::time::Clock;

use crate::{
    command::Command,
    domain::{
        chat::{self, ChatEntry, ChatLog},
        identity::SessionIdentity,
        mesh::{MeshCoordinator, PeerEvent, RemoteTrack, Signal},
        presence::Presence,
        timer::{BREAK_SECONDS, POMODORO_SECONDS, TimerCommand, TimerMachine, TimerState},
    },
    infrastructure::transport::Outbox,
};

/// Something the rendering layer should show
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Roster {
        users: Vec<String>,
        owner: String,
        arrived: Vec<String>,
        departed: Vec<String>,
    },
    Timer {
        state: TimerState,
        time_left: u32,
    },
    Tick {
        time_left: u32,
    },
    ChatHistory(Vec<ChatEntry>),
    Chat(ChatEntry),
    /// A remote track is now bound to the participant's tile
    RemoteStream {
        peer: String,
        kind: String,
    },
    PeerState {
        peer: String,
        state: String,
    },
    ServerError {
        code: String,
        message: String,
    },
    Notice(String),
    Disconnected,
}

pub struct RoomSession {
    identity: SessionIdentity,
    room_id: String,
    presence: Presence,
    timer: TimerMachine,
    chat: ChatLog,
    mesh: MeshCoordinator,
    outbox: Outbox,
    clock: Arc<dyn Clock>,
}

impl RoomSession {
    pub fn new(
        identity: SessionIdentity,
        room_id: impl Into<String>,
        outbox: Outbox,
        mesh: MeshCoordinator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            room_id: room_id.into(),
            presence: Presence::default(),
            timer: TimerMachine::new(),
            chat: ChatLog::default(),
            mesh,
            outbox,
            clock,
        }
    }

    /// Announce ourselves; sent once right after the socket opens
    pub fn join(&self) -> bool {
        self.outbox.send(ClientMessage::UserJoin {
            username: self.identity.username.clone(),
            session_id: self.identity.session_id.clone(),
            room_id: self.room_id.clone(),
        })
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Computed from the latest snapshot on every call
    pub fn is_owner(&self) -> bool {
        self.presence.is_owner(&self.identity.username)
    }

    pub fn timer(&self) -> &TimerMachine {
        &self.timer
    }

    pub fn chat(&self) -> &[ChatEntry] {
        self.chat.entries()
    }

    pub fn streams(&self) -> &BTreeMap<String, Vec<RemoteTrack>> {
        self.mesh.streams()
    }

    pub fn peer_names(&self) -> Vec<String> {
        self.mesh.peer_names()
    }

    pub fn is_connected(&self) -> bool {
        self.outbox.is_connected()
    }

    /// Apply one server frame
    pub async fn handle_server_message(&mut self, message: ServerMessage) -> Vec<RoomEvent> {
        match message {
            ServerMessage::UserList { users, owner } => {
                let (presence, change) =
                    self.presence
                        .reduce(&self.identity.username, &users, owner.as_deref());
                self.presence = presence;
                if !change.departed.is_empty() {
                    self.mesh.prune(&change.departed).await;
                }
                vec![RoomEvent::Roster {
                    users: self.presence.users.clone(),
                    owner: self.presence.owner.clone(),
                    arrived: change.arrived,
                    departed: change.departed,
                }]
            }
            ServerMessage::TimerUpdate { data } => {
                if let Some(stop) = self.timer.apply(timer_from_dto(data)) {
                    self.announce_expiry(stop);
                }
                vec![RoomEvent::Timer {
                    state: self.timer.state(),
                    time_left: self.timer.time_left(),
                }]
            }
            ServerMessage::ChatHistory { messages } => {
                let entries: Vec<ChatEntry> =
                    messages.into_iter().map(entry_from_dto).collect();
                self.chat.replace(entries.clone());
                vec![RoomEvent::ChatHistory(entries)]
            }
            ServerMessage::ChatMessage {
                username,
                message,
                timestamp,
            } => {
                let entry = ChatEntry {
                    username,
                    message,
                    timestamp: timestamp.unwrap_or_else(|| self.clock.now_millis()),
                };
                self.chat.append(entry.clone());
                vec![RoomEvent::Chat(entry)]
            }
            ServerMessage::WebrtcOffer { sdp, to, from } => {
                if self.is_addressed_to_me(&to) {
                    if let Some(answer) = self.mesh.handle_offer(&from, sdp).await {
                        self.send_signal(answer);
                    }
                }
                Vec::new()
            }
            ServerMessage::WebrtcAnswer { sdp, to, from } => {
                if self.is_addressed_to_me(&to) {
                    self.mesh.handle_answer(&from, sdp).await;
                }
                Vec::new()
            }
            ServerMessage::WebrtcIce {
                candidate,
                to,
                from,
            } => {
                if self.is_addressed_to_me(&to) {
                    self.mesh.handle_ice(&from, candidate).await;
                }
                Vec::new()
            }
            ServerMessage::Error { code, message } => {
                tracing::warn!("Server error [{}]: {}", code, message);
                vec![RoomEvent::ServerError { code, message }]
            }
            ServerMessage::Unknown => Vec::new(),
        }
    }

    /// Advance the local countdown by one second
    pub fn tick(&mut self) -> Vec<RoomEvent> {
        if !self.timer.is_running() {
            return Vec::new();
        }
        if let Some(stop) = self.timer.tick() {
            self.announce_expiry(stop);
        }
        vec![RoomEvent::Tick {
            time_left: self.timer.time_left(),
        }]
    }

    pub fn handle_peer_event(&mut self, event: PeerEvent) -> Vec<RoomEvent> {
        let shown = match &event {
            PeerEvent::RemoteTrack { peer, kind, .. } => Some(RoomEvent::RemoteStream {
                peer: peer.clone(),
                kind: kind.clone(),
            }),
            PeerEvent::StateChanged { peer, state } => Some(RoomEvent::PeerState {
                peer: peer.clone(),
                state: state.clone(),
            }),
            PeerEvent::LocalCandidate { .. } => None,
        };
        if let Some(signal) = self.mesh.handle_event(event) {
            self.send_signal(signal);
        }
        shown.into_iter().collect()
    }

    /// Run a room command.
    ///
    /// Owner-only commands are refused locally for everyone else; the server
    /// enforces the same rule for timer updates. Display-only commands
    /// (`Users`, `Timer`, `Help`, `Leave`) are left to the caller.
    pub async fn execute(&mut self, command: Command) -> Vec<RoomEvent> {
        if command.is_owner_only() && !self.is_owner() {
            let owner = if self.presence.owner.is_empty() {
                "nobody yet"
            } else {
                self.presence.owner.as_str()
            };
            return vec![RoomEvent::Notice(format!(
                "Only the room owner ({}) can do that",
                owner
            ))];
        }

        match command {
            Command::Chat(input) => self.send_chat(&input),
            Command::Start => {
                self.control_timer(TimerCommand::Start, "The timer is already running")
            }
            Command::Pause => self.control_timer(TimerCommand::Pause, "The timer is not running"),
            Command::Reset => {
                self.control_timer(TimerCommand::Reset(POMODORO_SECONDS), "Reset refused")
            }
            Command::Break => {
                self.control_timer(TimerCommand::Reset(BREAK_SECONDS), "Break refused")
            }
            Command::Connect => self.connect_all().await,
            Command::Users
            | Command::Timer
            | Command::Leave
            | Command::Help
            | Command::Unknown(_) => Vec::new(),
        }
    }

    fn send_chat(&self, input: &str) -> Vec<RoomEvent> {
        let Some(message) = chat::outgoing(input) else {
            return Vec::new();
        };
        let sent = self.outbox.send(ClientMessage::ChatMessage {
            message: message.to_string(),
            username: self.identity.username.clone(),
        });
        if sent {
            Vec::new()
        } else {
            vec![RoomEvent::Notice("Not connected, message dropped".to_string())]
        }
    }

    fn control_timer(&self, command: TimerCommand, refused: &str) -> Vec<RoomEvent> {
        match self.timer.command(command, self.clock.now_millis()) {
            Some(state) => {
                self.outbox.send(ClientMessage::TimerUpdate {
                    data: timer_to_dto(state),
                });
                Vec::new()
            }
            None => vec![RoomEvent::Notice(refused.to_string())],
        }
    }

    async fn connect_all(&mut self) -> Vec<RoomEvent> {
        let users = self.presence.users.clone();
        if users.is_empty() {
            return vec![RoomEvent::Notice("Nobody else is here yet".to_string())];
        }
        let offers = self.mesh.connect_all(&users).await;
        let count = offers.len();
        for offer in offers {
            self.send_signal(offer);
        }
        vec![RoomEvent::Notice(format!("Calling {} participant(s)", count))]
    }

    /// Only the owner announces expiry; others wait for the owner's update
    fn announce_expiry(&self, stop: TimerState) {
        if self.is_owner() {
            tracing::info!("Timer reached zero, announcing stop");
            self.outbox.send(ClientMessage::TimerUpdate {
                data: timer_to_dto(stop),
            });
        } else {
            tracing::debug!("Timer reached zero, waiting for the owner");
        }
    }

    fn is_addressed_to_me(&self, to: &str) -> bool {
        if to != self.identity.username {
            tracing::debug!("Ignoring signaling addressed to '{}'", to);
            return false;
        }
        true
    }

    fn send_signal(&self, signal: Signal) {
        let from = self.identity.username.clone();
        let frame = match signal {
            Signal::Offer { to, sdp } => ClientMessage::WebrtcOffer { sdp, to, from },
            Signal::Answer { to, sdp } => ClientMessage::WebrtcAnswer { sdp, to, from },
            Signal::Ice { to, candidate } => ClientMessage::WebrtcIce {
                candidate,
                to,
                from,
            },
        };
        self.outbox.send(frame);
    }

    /// The socket closed underneath us
    pub async fn on_disconnected(&mut self) -> Vec<RoomEvent> {
        self.mesh.close_all().await;
        vec![RoomEvent::Disconnected]
    }

    /// Leave the room: close every peer connection, then the socket
    pub async fn leave(&mut self) {
        self.mesh.close_all().await;
        self.outbox.close();
    }
}

fn timer_from_dto(dto: TimerStateDto) -> TimerState {
    TimerState {
        running: dto.running,
        remaining: dto.remaining,
        start_time: dto.start_time,
    }
}

fn timer_to_dto(state: TimerState) -> TimerStateDto {
    TimerStateDto {
        running: state.running,
        remaining: state.remaining,
        start_time: state.start_time,
    }
}

fn entry_from_dto(dto: ChatMessageDto) -> ChatEntry {
    ChatEntry {
        username: dto.username,
        message: dto.message,
        timestamp: dto.timestamp.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::mesh::fake::FakeFactory, infrastructure::transport::Outgoing};
    use serde_json::json;
    use studyroom_shared::time::FixedClock;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    const NOW: i64 = 1_700_000_000_000;

    fn create_room(username: &str) -> (RoomSession, UnboundedReceiver<Outgoing>) {
        let (outbox, rx) = Outbox::channel();
        let (events, _events_rx) = mpsc::unbounded_channel();
        let mesh = MeshCoordinator::new(username, Arc::new(FakeFactory::default()), events);
        let identity = SessionIdentity {
            session_id: format!("tab-1-{}", username),
            username: username.to_string(),
        };
        let room = RoomSession::new(identity, "math-1", outbox, mesh, Arc::new(FixedClock::new(NOW)));
        (room, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Outgoing>) -> Vec<ClientMessage> {
        let mut frames = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let Outgoing::Frame(frame) = item {
                frames.push(frame);
            }
        }
        frames
    }

    fn roster(users: &[&str], owner: Option<&str>) -> ServerMessage {
        ServerMessage::UserList {
            users: users.iter().map(|u| u.to_string()).collect(),
            owner: owner.map(str::to_string),
        }
    }

    fn timer_update(running: bool, remaining: u32) -> ServerMessage {
        ServerMessage::TimerUpdate {
            data: TimerStateDto {
                running,
                remaining,
                start_time: running.then_some(NOW),
            },
        }
    }

    #[tokio::test]
    async fn test_join_announces_identity() {
        // テスト項目: 接続直後に user_join が送信される
        // given (前提条件):
        let (room, mut rx) = create_room("alice");

        // when (操作):
        room.join();

        // then (期待する結果):
        assert_eq!(
            drain(&mut rx),
            vec![ClientMessage::UserJoin {
                username: "alice".to_string(),
                session_id: "tab-1-alice".to_string(),
                room_id: "math-1".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_roster_excludes_self_and_tracks_owner() {
        // テスト項目: user_list から自分が除かれ、オーナー判定が毎回更新される
        // given (前提条件):
        let (mut room, _rx) = create_room("bob");
        room.handle_server_message(roster(&["alice", "bob"], Some("alice")))
            .await;
        assert!(!room.is_owner());

        // when (操作):
        let events = room
            .handle_server_message(roster(&["bob", "carol"], None))
            .await;

        // then (期待する結果):
        assert!(room.is_owner());
        assert_eq!(
            events,
            vec![RoomEvent::Roster {
                users: vec!["carol".to_string()],
                owner: "bob".to_string(),
                arrived: vec!["carol".to_string()],
                departed: vec!["alice".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_owner_start_sends_timer_update() {
        // テスト項目: オーナーの /start で running=true の timer_update が送信される
        // given (前提条件):
        let (mut room, mut rx) = create_room("alice");
        room.handle_server_message(roster(&["alice", "bob"], Some("alice")))
            .await;
        room.handle_server_message(timer_update(false, 1500)).await;

        // when (操作):
        let events = room.execute(Command::Start).await;

        // then (期待する結果):
        assert!(events.is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![ClientMessage::TimerUpdate {
                data: TimerStateDto {
                    running: true,
                    remaining: 1500,
                    start_time: Some(NOW),
                }
            }]
        );
        // local state changes only when the server echoes it
        assert!(!room.timer().is_running());
    }

    #[tokio::test]
    async fn test_non_owner_commands_are_refused_locally() {
        // テスト項目: オーナー以外のタイマー操作と connect all は送信されない
        // given (前提条件):
        let (mut room, mut rx) = create_room("bob");
        room.handle_server_message(roster(&["alice", "bob"], Some("alice")))
            .await;

        // when (操作):
        let start = room.execute(Command::Start).await;
        let connect = room.execute(Command::Connect).await;

        // then (期待する結果):
        assert!(matches!(&start[..], [RoomEvent::Notice(n)] if n.contains("alice")));
        assert!(matches!(&connect[..], [RoomEvent::Notice(_)]));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_pause_and_break() {
        // テスト項目: /pause は残り時間を保ったまま停止、/break は 5 分にリセットする
        // given (前提条件):
        let (mut room, mut rx) = create_room("alice");
        room.handle_server_message(roster(&["alice"], None)).await;
        room.handle_server_message(timer_update(true, 1500)).await;
        room.tick();
        room.tick();

        // when (操作):
        room.execute(Command::Pause).await;
        room.execute(Command::Break).await;

        // then (期待する結果):
        let states: Vec<TimerStateDto> = drain(&mut rx)
            .into_iter()
            .filter_map(|frame| match frame {
                ClientMessage::TimerUpdate { data } => Some(data),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                TimerStateDto {
                    running: false,
                    remaining: 1498,
                    start_time: None
                },
                TimerStateDto {
                    running: false,
                    remaining: BREAK_SECONDS,
                    start_time: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_owner_announces_expiry_exactly_once() {
        // テスト項目: カウントダウンが 0 になったときオーナーは停止を 1 回だけ送る
        // given (前提条件):
        let (mut room, mut rx) = create_room("alice");
        room.handle_server_message(roster(&["alice"], None)).await;
        room.handle_server_message(timer_update(true, 2)).await;

        // when (操作):
        for _ in 0..5 {
            room.tick();
        }

        // then (期待する結果):
        assert_eq!(
            drain(&mut rx),
            vec![ClientMessage::TimerUpdate {
                data: TimerStateDto {
                    running: false,
                    remaining: 0,
                    start_time: Some(NOW),
                }
            }]
        );
    }

    #[tokio::test]
    async fn test_non_owner_does_not_announce_expiry() {
        // テスト項目: オーナー以外はカウントダウンが 0 になっても何も送らない
        // 0 到達で全員が停止を送る挙動とは異なる（サーバーはオーナー以外の更新を拒否する）
        // given (前提条件):
        let (mut room, mut rx) = create_room("bob");
        room.handle_server_message(roster(&["alice", "bob"], None)).await;
        room.handle_server_message(timer_update(true, 1)).await;

        // when (操作):
        let events = room.tick();

        // then (期待する結果):
        assert_eq!(events, vec![RoomEvent::Tick { time_left: 0 }]);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_overrides_local_countdown() {
        // テスト項目: timer_update を受けると残り時間がその値で上書きされる
        // given (前提条件):
        let (mut room, _rx) = create_room("bob");
        room.handle_server_message(timer_update(true, 1500)).await;
        room.tick();
        room.tick();

        // when (操作):
        let events = room.handle_server_message(timer_update(true, 1200)).await;

        // then (期待する結果):
        assert_eq!(room.timer().time_left(), 1200);
        assert!(matches!(&events[..], [RoomEvent::Timer { time_left: 1200, .. }]));
    }

    #[tokio::test]
    async fn test_chat_history_then_live_message() {
        // テスト項目: chat_history で置き換え、chat_message で末尾に追加される
        // given (前提条件):
        let (mut room, _rx) = create_room("bob");
        room.handle_server_message(ServerMessage::ChatHistory {
            messages: vec![ChatMessageDto {
                username: "alice".to_string(),
                message: "earlier".to_string(),
                timestamp: Some(1),
            }],
        })
        .await;

        // when (操作):
        room.handle_server_message(ServerMessage::ChatMessage {
            username: "alice songs".to_string(),
            message: "hello".to_string(),
            timestamp: None,
        })
        .await;

        // then (期待する結果):
        let messages: Vec<(&str, &str)> = room
            .chat()
            .iter()
            .map(|e| (e.username.as_str(), e.message.as_str()))
            .collect();
        assert_eq!(messages, vec![("alice", "earlier"), ("alice songs", "hello")]);
        assert_eq!(room.chat()[1].timestamp, NOW);
    }

    #[tokio::test]
    async fn test_blank_chat_is_not_sent() {
        // テスト項目: 空白だけのチャットは送信されない
        // given (前提条件):
        let (mut room, mut rx) = create_room("alice");

        // when (操作):
        room.execute(Command::Chat("  ".to_string())).await;
        room.execute(Command::Chat("hi".to_string())).await;

        // then (期待する結果):
        assert_eq!(
            drain(&mut rx),
            vec![ClientMessage::ChatMessage {
                message: "hi".to_string(),
                username: "alice".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_connect_all_and_answer_flow() {
        // テスト項目: connect all で offer を送り、受信した offer には answer を返す
        // given (前提条件):
        let (mut alice, mut alice_rx) = create_room("alice");
        let (mut bob, mut bob_rx) = create_room("bob");
        alice
            .handle_server_message(roster(&["alice", "bob"], None))
            .await;
        bob.handle_server_message(roster(&["alice", "bob"], None))
            .await;

        // when (操作):
        alice.execute(Command::Connect).await;
        let offer = drain(&mut alice_rx).remove(0);
        let ClientMessage::WebrtcOffer { sdp, to, from } = offer else {
            panic!("expected an offer");
        };
        bob.handle_server_message(ServerMessage::WebrtcOffer { sdp, to, from })
            .await;

        // then (期待する結果):
        assert_eq!(
            drain(&mut bob_rx),
            vec![ClientMessage::WebrtcAnswer {
                sdp: json!({"type": "answer", "sdp": "answer-for-alice"}),
                to: "alice".to_string(),
                from: "bob".to_string(),
            }]
        );
        assert_eq!(bob.peer_names(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_signaling_for_someone_else_is_ignored() {
        // テスト項目: 自分宛てでない offer には応答しない
        // given (前提条件):
        let (mut bob, mut bob_rx) = create_room("bob");

        // when (操作):
        bob.handle_server_message(ServerMessage::WebrtcOffer {
            sdp: json!({"type": "offer", "sdp": "x"}),
            to: "carol".to_string(),
            from: "alice".to_string(),
        })
        .await;

        // then (期待する結果):
        assert!(drain(&mut bob_rx).is_empty());
        assert!(bob.peer_names().is_empty());
    }

    #[tokio::test]
    async fn test_local_candidate_and_remote_track() {
        // テスト項目: ローカル ICE 候補は webrtc_ice として送られ、リモートトラックはタイルに表示される
        // given (前提条件):
        let (mut alice, mut rx) = create_room("alice");
        alice
            .handle_server_message(roster(&["alice", "bob"], None))
            .await;
        alice.execute(Command::Connect).await;
        drain(&mut rx);

        // when (操作):
        alice.handle_peer_event(PeerEvent::LocalCandidate {
            peer: "bob".to_string(),
            candidate: json!({"candidate": "c1"}),
        });
        let events = alice.handle_peer_event(PeerEvent::RemoteTrack {
            peer: "bob".to_string(),
            kind: "video".to_string(),
            track_id: "v".to_string(),
        });

        // then (期待する結果):
        assert_eq!(
            drain(&mut rx),
            vec![ClientMessage::WebrtcIce {
                candidate: json!({"candidate": "c1"}),
                to: "bob".to_string(),
                from: "alice".to_string(),
            }]
        );
        assert_eq!(
            events,
            vec![RoomEvent::RemoteStream {
                peer: "bob".to_string(),
                kind: "video".to_string(),
            }]
        );
        assert_eq!(alice.streams().len(), 1);
    }

    #[tokio::test]
    async fn test_departure_closes_peer_connection() {
        // テスト項目: ロスターから消えた参加者との接続が閉じられる
        // given (前提条件):
        let (mut alice, _rx) = create_room("alice");
        alice
            .handle_server_message(roster(&["alice", "bob"], None))
            .await;
        alice.execute(Command::Connect).await;

        // when (操作):
        alice.handle_server_message(roster(&["alice"], None)).await;

        // then (期待する結果):
        assert!(alice.peer_names().is_empty());
    }

    #[tokio::test]
    async fn test_sends_after_leave_are_dropped() {
        // テスト項目: 退室後の送信は破棄され、通知が返る
        // given (前提条件):
        let (mut room, mut rx) = create_room("alice");
        room.leave().await;
        drain(&mut rx);

        // when (操作):
        let events = room.execute(Command::Chat("anyone?".to_string())).await;

        // then (期待する結果):
        assert!(!room.is_connected());
        assert!(drain(&mut rx).is_empty());
        assert!(matches!(&events[..], [RoomEvent::Notice(_)]));
    }
}
