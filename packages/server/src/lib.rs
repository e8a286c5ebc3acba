//! Study-room server library.
//!
//! This library provides the authoritative side of the study-room protocol:
//! room membership and ownership, the owner-controlled shared timer, chat
//! history and fan-out, and the WebRTC signaling relay.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
