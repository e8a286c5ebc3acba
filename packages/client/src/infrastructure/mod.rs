//! Infrastructure layer
//!
//! Concrete implementations of the client seams: the persisted identity
//! store, the room WebSocket, and webrtc-rs peer connections with local media.

pub mod identity_store;
pub mod peer;
pub mod transport;
