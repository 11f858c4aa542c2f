//! Typing relay. Never persisted, never pushed.

use std::sync::Arc;

use outings_core::error::Result;
use outings_core::protocol::events::TypingReq;
use outings_core::protocol::outbound::TypingEvent;
use outings_core::protocol::ServerEvent;
use outings_core::RoomKey;

use crate::realtime::{Outgoing, RealtimeCore};

pub struct TypingNotifier {
    core: Arc<RealtimeCore>,
}

impl TypingNotifier {
    pub fn new(core: Arc<RealtimeCore>) -> Self {
        Self { core }
    }

    /// Relay to the recipient's user room, or else to the group room.
    /// Returns the number of connections reached; no target is a no-op.
    pub async fn relay(&self, sender: Option<&str>, req: TypingReq) -> Result<usize> {
        let user_id = sender.map(str::to_string);
        let (room, event) = match (req.recipient_id, req.group_id) {
            (Some(recipient), _) => (
                RoomKey::user(recipient),
                TypingEvent { is_typing: req.is_typing, user_id, group_id: None },
            ),
            (None, Some(group)) => (
                RoomKey::group(group.as_str()),
                TypingEvent { is_typing: req.is_typing, user_id, group_id: Some(group) },
            ),
            (None, None) => return Ok(0),
        };
        self.core
            .publish_room(&room, Outgoing::lossy(ServerEvent::Typing(event)))
            .await
    }
}
