//! Outings realtime core: transport-agnostic wire protocol, chat domain model,
//! and the shared error type.
//!
//! This crate defines the contracts shared by the gateway and its tests: what
//! a client may send, what the server emits, what a persisted chat message
//! looks like, and how rooms are named. It carries no transport or runtime
//! dependencies so it can be reused by clients and tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `RealtimeError`/`Result` so a malformed
//! client frame can never take a connection (or the process) down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod protocol;

/// Shared result type.
pub use error::{ClientCode, RealtimeError, Result};
pub use model::{ChatMessage, MessageDraft, MessageTarget, PushNotification, RoomKey};
