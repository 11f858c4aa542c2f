//! Message pipeline: normalize -> persist -> fan-out -> push fallback.
//!
//! Per sending connection, messages are persisted and fanned out in receive
//! order because the session loop awaits each `send` before reading the next
//! event. Nothing spans the steps transactionally: a persistence failure
//! aborts before any fan-out, a fan-out failure is logged without rollback,
//! and push is best-effort.

use std::sync::Arc;

use outings_core::error::Result;
use outings_core::model::DEFAULT_MESSAGE_TYPE;
use outings_core::protocol::events::SendMessageReq;
use outings_core::protocol::ServerEvent;
use outings_core::{ChatMessage, MessageDraft, MessageTarget, PushNotification, RoomKey};

use crate::config::SenderPolicy;
use crate::infra::{MessageStore, PushGateway, PushTokenStore};
use crate::obs::RealtimeMetrics;
use crate::realtime::{Outgoing, RealtimeCore};
use crate::services::presence::PresenceTracker;

pub struct MessagePipeline {
    pub(crate) core: Arc<RealtimeCore>,
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) presence: Arc<PresenceTracker>,
    pub(crate) push_tokens: Arc<dyn PushTokenStore>,
    pub(crate) push: Arc<dyn PushGateway>,
    pub(crate) metrics: Arc<RealtimeMetrics>,
    pub(crate) sender_policy: SenderPolicy,
    pub(crate) reliable_timeout_ms: u64,
    pub(crate) push_title: String,
}

/// Build a draft from a client payload.
///
/// `None` when the payload names no target: the message is dropped without
/// telling the sender. A recipient takes precedence over a group.
pub fn normalize(
    req: SendMessageReq,
    identity: Option<&str>,
    policy: SenderPolicy,
) -> Option<MessageDraft> {
    let target = match (req.recipient_id, req.group_id) {
        (Some(recipient_id), _) => MessageTarget::Direct { recipient_id },
        (None, Some(group_id)) => MessageTarget::Group { group_id },
        (None, None) => return None,
    };

    let claimed = req.sender_id;
    let sender_id = match policy {
        SenderPolicy::Connection => identity.map(str::to_string).or(claimed),
        SenderPolicy::Client => claimed.or_else(|| identity.map(str::to_string)),
    }
    .unwrap_or_default();

    let message_type = req
        .message_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MESSAGE_TYPE.to_string());

    Some(MessageDraft {
        text: req.text.unwrap_or_default(),
        sender_id,
        target,
        message_type,
        media_url: req.media_url.filter(|s| !s.is_empty()),
        file_name: req.file_name.filter(|s| !s.is_empty()),
        file_size: req.file_size,
    })
}

impl MessagePipeline {
    /// Handle one `send_message`. `Ok(None)` means the payload was dropped.
    pub async fn send(&self, identity: Option<&str>, req: SendMessageReq) -> Result<Option<ChatMessage>> {
        let Some(draft) = normalize(req, identity, self.sender_policy) else {
            tracing::debug!("send_message without recipientId/groupId dropped");
            return Ok(None);
        };

        let msg = self.store.create(draft).await?;
        let kind = if msg.group_id.is_some() { "group" } else { "direct" };
        self.metrics.messages_persisted.inc(&[("kind", kind)]);

        let rooms = fanout_rooms(&msg);
        let out = Outgoing::reliable(ServerEvent::ReceiveMessage(msg.clone()), self.reliable_timeout_ms);
        let delivered = self.core.publish_rooms(&rooms, out).await?;
        tracing::debug!(message_id = %msg.id, kind, delivered, "message fanned out");

        if let Some(recipient) = msg.recipient_id.as_deref() {
            self.push_if_offline(&msg, recipient).await;
        }
        Ok(Some(msg))
    }

    /// Best-effort: every failure is logged and swallowed.
    async fn push_if_offline(&self, msg: &ChatMessage, recipient: &str) {
        match self.presence.is_online(recipient).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(user = %recipient, error = %e, "presence lookup failed; skipping push");
                return;
            }
        }

        let token = match self.push_tokens.push_token(recipient).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.metrics.push.inc(&[("result", "no_token")]);
                return;
            }
            Err(e) => {
                tracing::warn!(user = %recipient, error = %e, "push token lookup failed");
                self.metrics.push.inc(&[("result", "error")]);
                return;
            }
        };

        let notification = PushNotification::for_message(token, self.push_title.as_str(), msg);
        match self.push.send(notification).await {
            Ok(()) => self.metrics.push.inc(&[("result", "sent")]),
            Err(e) => {
                tracing::warn!(user = %recipient, message_id = %msg.id, error = %e, "push error");
                self.metrics.push.inc(&[("result", "error")]);
            }
        }
    }
}

/// Direct: sender's and recipient's user rooms. Group: the group room plus
/// the sender's user room, covering sender devices a stale room list missed.
pub fn fanout_rooms(msg: &ChatMessage) -> Vec<RoomKey> {
    let sender = RoomKey::user(msg.sender_id.as_str());
    match (&msg.recipient_id, &msg.group_id) {
        (Some(recipient), _) => vec![sender, RoomKey::user(recipient.as_str())],
        (None, Some(group)) => vec![RoomKey::group(group.as_str()), sender],
        (None, None) => vec![sender],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> SendMessageReq {
        SendMessageReq {
            text: Some("hi".into()),
            ..SendMessageReq::default()
        }
    }

    #[test]
    fn no_target_is_dropped() {
        assert!(normalize(req(), Some("u1"), SenderPolicy::Connection).is_none());
    }

    #[test]
    fn recipient_wins_over_group() {
        let r = SendMessageReq {
            recipient_id: Some("u2".into()),
            group_id: Some("g1".into()),
            ..req()
        };
        let d = normalize(r, Some("u1"), SenderPolicy::Connection);
        assert_eq!(
            d.map(|d| d.target),
            Some(MessageTarget::Direct { recipient_id: "u2".into() })
        );
    }

    #[test]
    fn connection_identity_overrides_claimed_sender() {
        let r = SendMessageReq {
            sender_id: Some("mallory".into()),
            group_id: Some("g1".into()),
            ..req()
        };
        let d = normalize(r.clone(), Some("u1"), SenderPolicy::Connection);
        assert_eq!(d.map(|d| d.sender_id).as_deref(), Some("u1"));

        let d = normalize(r.clone(), None, SenderPolicy::Connection);
        assert_eq!(d.map(|d| d.sender_id).as_deref(), Some("mallory"));

        let d = normalize(r, Some("u1"), SenderPolicy::Client);
        assert_eq!(d.map(|d| d.sender_id).as_deref(), Some("mallory"));
    }

    #[test]
    fn defaults_are_applied() {
        let r = SendMessageReq {
            text: None,
            group_id: Some("g1".into()),
            message_type: Some("  ".into()),
            media_url: Some(String::new()),
            ..SendMessageReq::default()
        };
        let d = normalize(r, None, SenderPolicy::Connection).expect("group target");
        assert_eq!(d.text, "");
        assert_eq!(d.sender_id, "");
        assert_eq!(d.message_type, "text");
        assert!(d.media_url.is_none());
    }

    #[test]
    fn group_fanout_includes_sender_room() {
        let draft = normalize(
            SendMessageReq { group_id: Some("g1".into()), ..req() },
            Some("u1"),
            SenderPolicy::Connection,
        );
        let msg = ChatMessage::from_draft("m1", chrono::Utc::now(), draft.expect("group target"));
        assert_eq!(fanout_rooms(&msg), vec![RoomKey::group("g1"), RoomKey::user("u1")]);
    }
}
