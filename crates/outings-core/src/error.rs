//! Shared error type across the outings crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed payload.
    BadRequest,
    /// Referenced entity does not exist.
    NotFound,
    /// Caller is not a participant of the conversation.
    NotAllowed,
    /// Unsupported protocol version.
    UnsupportedVersion,
    /// Internal server error (storage, push, serialization).
    Internal,
}

impl ClientCode {
    /// String representation used in JSON frames.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::NotAllowed => "NOT_ALLOWED",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not allowed: {0}")]
    NotAllowed(String),
    /// The backing store lacks a capability (e.g. no read timestamp column).
    #[error("unsupported by store: {0}")]
    Unsupported(String),
    #[error("store: {0}")]
    Store(String),
    #[error("push: {0}")]
    Push(String),
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl RealtimeError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RealtimeError::BadRequest(_) => ClientCode::BadRequest,
            RealtimeError::NotFound(_) => ClientCode::NotFound,
            RealtimeError::NotAllowed(_) => ClientCode::NotAllowed,
            RealtimeError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            RealtimeError::Unsupported(_)
            | RealtimeError::Store(_)
            | RealtimeError::Push(_)
            | RealtimeError::Internal(_) => ClientCode::Internal,
        }
    }
}
