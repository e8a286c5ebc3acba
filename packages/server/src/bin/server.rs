//! Study-room server.
//!
//! Hosts any number of rooms. Each room tracks presence and ownership, holds the
//! owner-controlled Pomodoro timer and the chat history, and relays WebRTC
//! signaling between participants.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin studyroom-server
//! cargo run --bin studyroom-server -- --host 0.0.0.0 --port 8000
//! ```

use std::sync::Arc;

use clap::Parser;
use studyroom_server::{
    domain::entity::{DEFAULT_HISTORY_CAPACITY, DEFAULT_PARTICIPANT_CAPACITY},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
        GetRoomsUseCase, RelaySignalUseCase, SendMessageUseCase, UpdateTimerUseCase,
    },
};
use studyroom_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "studyroom-server")]
#[command(about = "Study-room server with shared timer, chat and WebRTC signaling", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8000")]
    port: u16,

    /// Maximum number of simultaneous connections per room
    #[arg(long, default_value_t = DEFAULT_PARTICIPANT_CAPACITY)]
    participant_capacity: usize,

    /// Number of chat messages kept per room for replay on join
    #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    history_capacity: usize,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // 1. Create Repository (in-memory database)
    let repository = Arc::new(InMemoryRoomRepository::with_capacity(
        args.participant_capacity,
        args.history_capacity,
    ));

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::default());

    // 3. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let update_timer_usecase = Arc::new(UpdateTimerUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let relay_signal_usecase = Arc::new(RelaySignalUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(repository.clone()));
    let get_room_detail_usecase = Arc::new(GetRoomDetailUseCase::new(repository.clone()));

    // 4. Create and run the server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        send_message_usecase,
        update_timer_usecase,
        relay_signal_usecase,
        get_rooms_usecase,
        get_room_detail_usecase,
        message_pusher,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
