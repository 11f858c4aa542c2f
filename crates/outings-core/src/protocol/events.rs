//! Typed client -> server events.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{RealtimeError, Result};
use crate::protocol::text::Envelope;
use crate::protocol::PROTOCOL_VERSION;

/// `typing` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingReq {
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default, deserialize_with = "opt_id")]
    pub recipient_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub group_id: Option<String>,
}

/// `send_message` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageReq {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub sender_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub recipient_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "opt_size")]
    pub file_size: Option<i64>,
}

/// `read_message` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMessageReq {
    #[serde(default, deserialize_with = "opt_id")]
    pub message_id: Option<String>,
}

/// `join_group` / `leave_group` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReq {
    #[serde(default, deserialize_with = "opt_id")]
    pub group_id: Option<String>,
}

/// `presence_query` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceQueryReq {
    #[serde(default, deserialize_with = "opt_id")]
    pub peer_user_id: Option<String>,
}

/// Everything a client may send after the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Typing(TypingReq),
    SendMessage(SendMessageReq),
    ReadMessage(ReadMessageReq),
    JoinGroup(GroupReq),
    LeaveGroup(GroupReq),
    RefreshGroups,
    PresenceQuery(PresenceQueryReq),
}

impl ClientEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Typing(_) => "typing",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::ReadMessage(_) => "read_message",
            ClientEvent::JoinGroup(_) => "join_group",
            ClientEvent::LeaveGroup(_) => "leave_group",
            ClientEvent::RefreshGroups => "refresh_groups",
            ClientEvent::PresenceQuery(_) => "presence_query",
        }
    }

    /// Resolve an envelope into a typed event.
    pub fn from_envelope(env: Envelope) -> Result<Self> {
        if env.v != PROTOCOL_VERSION {
            return Err(RealtimeError::UnsupportedVersion);
        }
        let data = env.data.as_deref();
        let ev = match env.event.as_str() {
            "typing" => ClientEvent::Typing(parse_data(data)?),
            "send_message" => ClientEvent::SendMessage(parse_data(data)?),
            "read_message" => ClientEvent::ReadMessage(parse_data(data)?),
            "join_group" => ClientEvent::JoinGroup(parse_data(data)?),
            "leave_group" => ClientEvent::LeaveGroup(parse_data(data)?),
            "refresh_groups" => ClientEvent::RefreshGroups,
            "presence_query" => ClientEvent::PresenceQuery(parse_data(data)?),
            other => return Err(RealtimeError::BadRequest(format!("unknown event: {other}"))),
        };
        Ok(ev)
    }
}

/// Decode a text frame straight into a typed event.
pub fn decode_text(s: &str) -> Result<ClientEvent> {
    let env: Envelope = serde_json::from_str(s)
        .map_err(|e| RealtimeError::BadRequest(format!("invalid envelope json: {e}")))?;
    ClientEvent::from_envelope(env)
}

/// Missing or `null` data means an empty payload.
fn parse_data<T: DeserializeOwned + Default>(raw: Option<&RawValue>) -> Result<T> {
    match raw {
        None => Ok(T::default()),
        Some(r) if r.get().trim() == "null" => Ok(T::default()),
        Some(r) => serde_json::from_str(r.get())
            .map_err(|e| RealtimeError::BadRequest(format!("invalid data: {e}"))),
    }
}

/// Ids arrive as strings or numbers; blank strings count as absent.
fn opt_id<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Sizes arrive as integers, floats or numeric strings; anything else is absent.
fn opt_size<'de, D>(d: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    fn from_float(f: f64) -> Option<i64> {
        f.is_finite().then_some(f as i64)
    }

    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(from_float)),
        Some(Value::String(s)) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    })
}
