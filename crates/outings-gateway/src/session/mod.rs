//! Connection lifecycle controller.
//!
//! Each connection is an actor: the transport decodes frames into
//! `SessionEvent`s and a single loop consumes them in order, so one
//! connection's handlers never overlap.

mod lifecycle;

pub use lifecycle::{Phase, Session, SessionEvent};
