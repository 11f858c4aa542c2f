//! Read receipts.
//!
//! The reader must be a participant: the recipient of a direct message or a
//! member of the message's group. Anything else is rejected before the store
//! is touched.

use std::sync::Arc;

use chrono::Utc;

use outings_core::error::{RealtimeError, Result};
use outings_core::protocol::outbound::MessageReadEvent;
use outings_core::protocol::ServerEvent;
use outings_core::{ChatMessage, MessageTarget, RoomKey};

use crate::infra::{MembershipStore, MessageStore};
use crate::realtime::{Outgoing, RealtimeCore};

pub struct ReadReceipts {
    core: Arc<RealtimeCore>,
    store: Arc<dyn MessageStore>,
    memberships: Arc<dyn MembershipStore>,
    reliable_timeout_ms: u64,
}

impl ReadReceipts {
    pub fn new(
        core: Arc<RealtimeCore>,
        store: Arc<dyn MessageStore>,
        memberships: Arc<dyn MembershipStore>,
        reliable_timeout_ms: u64,
    ) -> Self {
        Self { core, store, memberships, reliable_timeout_ms }
    }

    /// Mark `message_id` read by `reader` and relay the receipt.
    pub async fn mark_read(&self, reader: Option<&str>, message_id: &str) -> Result<ChatMessage> {
        let reader = reader
            .ok_or_else(|| RealtimeError::NotAllowed("anonymous reader".into()))?;
        let msg = self
            .store
            .get(message_id)
            .await?
            .ok_or_else(|| RealtimeError::NotFound(format!("message {message_id}")))?;
        let target = msg
            .target()
            .ok_or_else(|| RealtimeError::Internal(format!("message {message_id} has no single target")))?;

        self.authorize(reader, &target).await?;

        let updated = match self.store.mark_read(message_id, Utc::now()).await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(message_id, error = %e, "timestamped read failed; marking flag only");
                self.store.mark_read_flag_only(message_id).await?
            }
        };

        let rooms = match &target {
            MessageTarget::Group { group_id } => vec![RoomKey::group(group_id.as_str())],
            MessageTarget::Direct { recipient_id } => vec![
                RoomKey::user(updated.sender_id.as_str()),
                RoomKey::user(recipient_id.as_str()),
            ],
        };
        let ev = ServerEvent::MessageRead(MessageReadEvent {
            message_id: message_id.to_string(),
            reader_id: reader.to_string(),
        });
        self.core
            .publish_rooms(&rooms, Outgoing::reliable(ev, self.reliable_timeout_ms))
            .await?;
        Ok(updated)
    }

    async fn authorize(&self, reader: &str, target: &MessageTarget) -> Result<()> {
        let allowed = match target {
            MessageTarget::Direct { recipient_id } => recipient_id == reader,
            MessageTarget::Group { group_id } => self.memberships.is_member(reader, group_id).await?,
        };
        if allowed {
            Ok(())
        } else {
            Err(RealtimeError::NotAllowed(format!("{reader} is not a participant")))
        }
    }
}
