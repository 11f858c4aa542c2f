use std::sync::Arc;

use axum::extract::ws::Message;

use outings_core::error::Result;
use outings_core::protocol::ServerEvent;

/// Quality-of-Service strategy for outgoing delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    /// Latency-critical: do not await; if the connection's queue is full, drop.
    #[default]
    Lossy,
    /// Reliability-critical: await queue space, optionally bounded by a timeout.
    Reliable { timeout_ms: u64 },
}

/// Application-level outgoing event.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub qos: QoS,
    pub event: ServerEvent,
}

impl Outgoing {
    pub fn lossy(event: ServerEvent) -> Self {
        Self { qos: QoS::Lossy, event }
    }

    pub fn reliable(event: ServerEvent, timeout_ms: u64) -> Self {
        Self { qos: QoS::Reliable { timeout_ms }, event }
    }
}

/// Prepared frame cached for fan-out (serialize once, send N times).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMsg(Arc<str>);

impl PreparedMsg {
    pub fn prepare(out: &Outgoing) -> Result<Self> {
        Ok(PreparedMsg(Arc::from(out.event.to_frame()?)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to axum::ws::Message for transport.
    /// NOTE: axum::Message::Text owns a String, so each connection gets a copy here.
    pub fn to_ws_message(&self) -> Message {
        Message::Text(self.0.to_string())
    }
}
