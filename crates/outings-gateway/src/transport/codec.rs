//! Decode-once codec for the transport layer.
//!
//! - Text frames => typed `ClientEvent` (lazy `RawValue` payload)
//! - Binary frames => rejected (no binary lane)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use outings_core::{
    error::{RealtimeError, Result},
    protocol::{events::decode_text, ClientEvent},
};

#[derive(Debug)]
pub enum Inbound {
    Event(ClientEvent),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => Ok(Inbound::Event(decode_text(&s)?)),
        Message::Binary(_) => Err(RealtimeError::BadRequest("binary frames are not supported".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

/// Cheap size check before any parsing.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) | Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}
