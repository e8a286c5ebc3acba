//! Study-room client library.
//!
//! Joins one room over a single WebSocket and keeps the local view of it:
//! who is present and who owns the room, the shared Pomodoro timer, the chat
//! log, and a full mesh of WebRTC peer connections negotiated through the
//! same socket.

pub mod command;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod room;

mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::{ClientOptions, run_client};
