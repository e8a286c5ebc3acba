//! Client-side domain logic.
//!
//! The presence, timer and chat modules are pure reducers over inbound
//! snapshots; `mesh` owns the per-peer connection lifecycle behind traits so it
//! can be driven without a real WebRTC stack.

pub mod chat;
pub mod identity;
pub mod mesh;
pub mod presence;
pub mod timer;
