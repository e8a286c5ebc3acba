//! Domain-level error types.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is too long ({length} > {max} characters)")]
    TooLong {
        field: &'static str,
        max: usize,
        length: usize,
    },

    #[error("{0} must not contain '{1}'")]
    InvalidCharacter(&'static str, char),
}

/// Errors raised by Room state transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("session '{0}' is already connected to this room")]
    DuplicateSession(String),

    #[error("room is full ({0} participants)")]
    RoomCapacityExceeded(usize),

    #[error("'{0}' is not the owner of this room")]
    NotOwner(String),

    #[error("'{0}' is not in this room")]
    ParticipantNotFound(String),
}

/// Errors raised by repository implementations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Errors raised by message pusher implementations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client '{0}' not found")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to encode notification: {0}")]
    Encode(String),
}
