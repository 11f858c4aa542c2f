//! Server -> client events.
//!
//! Frames carry the protocol version next to the adjacently tagged event:
//! `{"v":1,"type":"presence","data":{"userId":"u1","online":true}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RealtimeError, Result};
use crate::model::ChatMessage;
use crate::protocol::PROTOCOL_VERSION;

/// Sent once per connection after room setup completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub is_typing: bool,
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub user_id: String,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadEvent {
    pub message_id: String,
    pub reader_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
}

impl ErrorEvent {
    pub fn from_error(err: &RealtimeError) -> Self {
        Self {
            code: err.client_code().as_str().to_string(),
            message: err.to_string(),
        }
    }
}

/// Everything the server emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected(ConnectedEvent),
    ReceiveMessage(ChatMessage),
    Typing(TypingEvent),
    Presence(PresenceEvent),
    MessageRead(MessageReadEvent),
    Error(ErrorEvent),
}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    v: u8,
    #[serde(flatten)]
    event: &'a ServerEvent,
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected(_) => "connected",
            ServerEvent::ReceiveMessage(_) => "receive_message",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::Presence(_) => "presence",
            ServerEvent::MessageRead(_) => "message_read",
            ServerEvent::Error(_) => "error",
        }
    }

    /// Encode as a versioned text frame.
    pub fn to_frame(&self) -> Result<String> {
        serde_json::to_string(&OutboundFrame { v: PROTOCOL_VERSION, event: self })
            .map_err(|e| RealtimeError::Internal(format!("json encode failed: {e}")))
    }

    /// Decode a versioned text frame (client side / tests).
    pub fn from_frame(s: &str) -> Result<Self> {
        let mut v: Value = serde_json::from_str(s)
            .map_err(|e| RealtimeError::BadRequest(format!("invalid frame json: {e}")))?;
        let obj = v
            .as_object_mut()
            .ok_or_else(|| RealtimeError::BadRequest("frame must be an object".into()))?;
        match obj.remove("v").and_then(|v| v.as_u64()) {
            Some(ver) if ver == u64::from(PROTOCOL_VERSION) => {}
            _ => return Err(RealtimeError::UnsupportedVersion),
        }
        serde_json::from_value(v).map_err(|e| RealtimeError::BadRequest(format!("invalid event: {e}")))
    }
}
