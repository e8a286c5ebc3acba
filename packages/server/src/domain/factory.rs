//! Identifier factories.

use uuid::Uuid;

use super::{error::ValueObjectError, value_object::SessionId};

/// Generates session ids for connections that did not bring their own
/// (the legacy `/ws/studyroom/{room_id}/{username}` route).
pub struct SessionIdFactory;

impl SessionIdFactory {
    pub fn generate() -> Result<SessionId, ValueObjectError> {
        SessionId::new(format!("legacy-{}", Uuid::new_v4()))
    }
}
