//! Chat domain model shared by the gateway and its collaborators.
//!
//! `ChatMessage` is owned by the external message store; the realtime layer
//! only creates it from a `MessageDraft`, reads it, and flips its read flag.
//! `RoomKey` is a derived multicast address and is never persisted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default `messageType` for drafts that do not specify one.
pub const DEFAULT_MESSAGE_TYPE: &str = "text";

/// Multicast room address.
///
/// Every connection of a known user joins `user:<id>`; group rooms are derived
/// from the membership store at connect time and on explicit refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomKey {
    User(String),
    Group(String),
}

impl RoomKey {
    pub fn user(id: impl Into<String>) -> Self {
        RoomKey::User(id.into())
    }

    pub fn group(id: impl Into<String>) -> Self {
        RoomKey::Group(id.into())
    }

    pub fn is_group(&self) -> bool {
        matches!(self, RoomKey::Group(_))
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::User(id) => write!(f, "user:{id}"),
            RoomKey::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// Exactly one addressee: a single user or a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    Direct { recipient_id: String },
    Group { group_id: String },
}

/// Normalized message awaiting persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub text: String,
    pub sender_id: String,
    pub target: MessageTarget,
    pub message_type: String,
    pub media_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
}

/// Persisted chat message as emitted in `receive_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub message_type: String,
    pub media_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
}

impl ChatMessage {
    /// Materialize a draft with store-assigned identity. Unread by construction.
    pub fn from_draft(id: impl Into<String>, created_at: DateTime<Utc>, draft: MessageDraft) -> Self {
        let (recipient_id, group_id) = match draft.target {
            MessageTarget::Direct { recipient_id } => (Some(recipient_id), None),
            MessageTarget::Group { group_id } => (None, Some(group_id)),
        };
        Self {
            id: id.into(),
            text: draft.text,
            sender_id: draft.sender_id,
            recipient_id,
            group_id,
            created_at,
            is_read: false,
            read_at: None,
            message_type: draft.message_type,
            media_url: draft.media_url,
            file_name: draft.file_name,
            file_size: draft.file_size,
        }
    }

    /// `None` only for records that violate the one-target invariant.
    pub fn target(&self) -> Option<MessageTarget> {
        match (&self.recipient_id, &self.group_id) {
            (Some(r), None) => Some(MessageTarget::Direct { recipient_id: r.clone() }),
            (None, Some(g)) => Some(MessageTarget::Group { group_id: g.clone() }),
            _ => None,
        }
    }
}

/// Visible part of a push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushBody {
    pub title: String,
    pub body: String,
}

/// Push data map. Every value is a string; absent values are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    pub sender_id: String,
    pub recipient_id: String,
    pub group_id: String,
    pub message_id: String,
    pub message_type: String,
    pub media_url: String,
}

/// Outbound call to the push gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub token: String,
    pub notification: PushBody,
    pub data: PushData,
}

impl PushNotification {
    /// Fixed notification shape for a chat message.
    pub fn for_message(token: impl Into<String>, title: impl Into<String>, msg: &ChatMessage) -> Self {
        let body = if msg.text.is_empty() {
            "You have a new message".to_string()
        } else {
            msg.text.clone()
        };
        let message_type = if msg.message_type.is_empty() {
            DEFAULT_MESSAGE_TYPE.to_string()
        } else {
            msg.message_type.clone()
        };
        Self {
            token: token.into(),
            notification: PushBody { title: title.into(), body },
            data: PushData {
                sender_id: msg.sender_id.clone(),
                recipient_id: msg.recipient_id.clone().unwrap_or_default(),
                group_id: msg.group_id.clone().unwrap_or_default(),
                message_id: msg.id.clone(),
                message_type,
                media_url: msg.media_url.clone().unwrap_or_default(),
            },
        }
    }
}
