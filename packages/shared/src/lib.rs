//! Utilities shared by the study-room server and client.

pub mod logger;
pub mod time;
