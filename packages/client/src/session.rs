//! Interactive room session.
//!
//! One task drives the [`RoomSession`]: inbound frames, the one-second
//! countdown, peer connection callbacks and user input are all processed in
//! arrival order on the same loop. Input comes from a blocking rustyline
//! thread over an mpsc channel.

use std::{sync::Arc, time::Duration};

use rustyline::{DefaultEditor, error::ReadlineError};
use studyroom_shared::time::SystemClock;
use tokio::{
    sync::mpsc,
    time::{Instant, interval_at},
};

use crate::{
    command::Command,
    domain::{identity::SessionIdentity, mesh::MeshCoordinator, mesh::PeerConnectionFactory},
    error::ClientError,
    formatter::{MessageFormatter, is_notable_tick},
    infrastructure::transport::Connection,
    room::{RoomEvent, RoomSession},
    ui::redisplay_prompt,
};

const TICK: Duration = Duration::from_secs(1);

/// Run the room session until the user leaves or the connection drops.
///
/// # Errors
///
/// `ConnectionError` when the server closed the connection. There is no
/// reconnect: the session identity is already bound to the dropped socket.
pub async fn run_room_session(
    mut connection: Connection,
    identity: SessionIdentity,
    room_id: &str,
    factory: Arc<dyn PeerConnectionFactory>,
) -> Result<(), ClientError> {
    let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
    let mesh = MeshCoordinator::new(identity.username.clone(), factory, peer_tx);
    let mut room = RoomSession::new(
        identity,
        room_id,
        connection.outbox.clone(),
        mesh,
        Arc::new(SystemClock),
    );
    room.join();

    let username = room.identity().username.clone();
    print!(
        "{}",
        MessageFormatter::format_welcome(room_id, &username, &room.identity().session_id)
    );

    let mut input_rx = spawn_readline(username.clone());
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    let mut view = View::new(username);

    let result = loop {
        tokio::select! {
            frame = connection.inbound.recv() => match frame {
                Some(frame) => {
                    let events = room.handle_server_message(frame).await;
                    view.render(&events);
                }
                None => {
                    let events = room.on_disconnected().await;
                    view.render(&events);
                    break Err(ClientError::ConnectionError("Connection lost".to_string()));
                }
            },
            _ = ticker.tick() => {
                let events = room.tick();
                view.render(&events);
            }
            Some(event) = peer_rx.recv() => {
                let events = room.handle_peer_event(event);
                view.render(&events);
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break Ok(());
                };
                match Command::parse(&line) {
                    None => redisplay_prompt(&view.username),
                    Some(Command::Leave) => break Ok(()),
                    Some(Command::Users) => view.show_users(&room),
                    Some(Command::Timer) => view.show_timer(&room),
                    Some(Command::Help) => view.print(&MessageFormatter::format_help()),
                    Some(Command::Unknown(name)) => view.print(&MessageFormatter::format_notice(
                        &format!("Unknown command {} (try /help)", name),
                    )),
                    Some(command) => {
                        let events = room.execute(command).await;
                        if events.is_empty() {
                            redisplay_prompt(&view.username);
                        }
                        view.render(&events);
                    }
                }
            }
        }
    };

    tracing::info!("Leaving room '{}'", room.room_id());
    room.leave().await;
    connection.close().await;
    result
}

/// Read lines on a blocking thread; the channel closes on Ctrl+C / Ctrl+D
fn spawn_readline(username: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };
        let prompt = format!("{}> ", username);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str()).ok();
                    }
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });
    input_rx
}

/// Terminal rendering of room events
struct View {
    username: String,
    owner: String,
}

impl View {
    fn new(username: String) -> Self {
        Self {
            username,
            owner: String::new(),
        }
    }

    fn print(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        print!("{}", text);
        redisplay_prompt(&self.username);
    }

    fn render(&mut self, events: &[RoomEvent]) {
        for event in events {
            let text = match event {
                RoomEvent::Roster {
                    users,
                    owner,
                    arrived,
                    departed,
                } => {
                    let mut text = if self.owner.is_empty() {
                        MessageFormatter::format_roster(users, owner, &self.username)
                    } else {
                        MessageFormatter::format_roster_change(arrived, departed)
                    };
                    if *owner != self.owner {
                        if !self.owner.is_empty() {
                            text.push_str(&MessageFormatter::format_owner_change(
                                owner,
                                *owner == self.username,
                            ));
                        }
                        self.owner = owner.clone();
                    }
                    text
                }
                RoomEvent::Timer { state, time_left } => {
                    MessageFormatter::format_timer(state, *time_left)
                }
                RoomEvent::Tick { time_left } if is_notable_tick(*time_left) => {
                    MessageFormatter::format_tick(*time_left)
                }
                RoomEvent::Tick { .. } => String::new(),
                RoomEvent::ChatHistory(entries) => MessageFormatter::format_chat_history(entries),
                RoomEvent::Chat(entry) => MessageFormatter::format_chat_message(entry),
                RoomEvent::RemoteStream { peer, kind } => {
                    MessageFormatter::format_remote_stream(peer, kind)
                }
                RoomEvent::PeerState { peer, state } => {
                    MessageFormatter::format_peer_state(peer, state)
                }
                RoomEvent::ServerError { code, message } => {
                    MessageFormatter::format_server_error(code, message)
                }
                RoomEvent::Notice(message) => MessageFormatter::format_notice(message),
                RoomEvent::Disconnected => {
                    MessageFormatter::format_notice("Disconnected from the room")
                }
            };
            self.print(&text);
        }
    }

    fn show_users(&self, room: &RoomSession) {
        let presence = room.presence();
        let mut text = MessageFormatter::format_roster(&presence.users, &presence.owner, &self.username);
        let tiles: Vec<(String, Vec<String>)> = room
            .streams()
            .iter()
            .map(|(peer, tracks)| (peer.clone(), tracks.iter().map(|t| t.kind.clone()).collect()))
            .collect();
        text.push_str(&MessageFormatter::format_tiles(&tiles));
        self.print(&text);
    }

    fn show_timer(&self, room: &RoomSession) {
        let timer = room.timer();
        self.print(&MessageFormatter::format_timer(&timer.state(), timer.time_left()));
    }
}
