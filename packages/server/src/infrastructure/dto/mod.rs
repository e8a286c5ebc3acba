//! Data Transfer Objects (DTOs) for the study-room protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: JSON frames exchanged over the room WebSocket
//! - `http`: HTTP API response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
