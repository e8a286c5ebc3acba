//! Infrastructure layer
//!
//! ドメイン層のインターフェースの具体的な実装と、ワイヤ形式（DTO）を提供します。

pub mod dto;
pub mod message_pusher;
pub mod repository;
