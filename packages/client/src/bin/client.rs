//! Study-room client.
//!
//! Joins a room, shows presence, the shared timer and chat, and negotiates
//! peer-to-peer media with everyone in the room. The identity of a profile
//! directory is reused across runs, the way a browser tab reuses local storage.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin studyroom-client -- --room math-1
//! cargo run --bin studyroom-client -- --room math-1 --profile .studyroom-bob --no-media
//! ```

use std::path::PathBuf;

use clap::Parser;

use studyroom_client::{ClientOptions, error::ClientError, infrastructure::peer::PeerConfig};
use studyroom_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "studyroom-client")]
#[command(about = "Study-room client with shared timer, chat and WebRTC video", long_about = None)]
struct Args {
    /// Room to join
    #[arg(short = 'r', long, default_value = "math-1")]
    room: String,

    /// Server base URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8000")]
    url: String,

    /// Profile directory (one per tab)
    #[arg(short = 'p', long, default_value = ".studyroom")]
    profile: PathBuf,

    /// Auth token (JWT) whose username claim names this session
    #[arg(long)]
    token: Option<String>,

    /// Join without local camera/microphone
    #[arg(long)]
    no_media: bool,

    /// STUN server URLs (a public STUN server when omitted)
    #[arg(long = "stun")]
    stun: Vec<String>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let peer_config = if args.stun.is_empty() {
        PeerConfig::default()
    } else {
        PeerConfig {
            ice_servers: args.stun,
            include_loopback: false,
        }
    };
    let options = ClientOptions {
        url: args.url,
        room_id: args.room,
        profile: args.profile,
        token: args.token,
        media: !args.no_media,
        peer_config,
    };

    if let Err(e) = studyroom_client::run_client(options).await {
        if let ClientError::DuplicateSession(session_id) = &e {
            tracing::error!(
                "Session '{}' is already in this room (another client uses this profile). Exiting.",
                session_id
            );
        } else {
            tracing::error!("Client error: {}", e);
        }
        std::process::exit(1);
    }
}
