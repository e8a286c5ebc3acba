//! Request handlers.

mod http;
mod websocket;

pub use http::{get_room_detail, get_rooms, health_check};
pub use websocket::{legacy_websocket_handler, websocket_handler};
