//! Presence tracker: online/offline transitions and point-in-time queries.

use std::sync::Arc;

use outings_core::error::Result;
use outings_core::protocol::outbound::PresenceEvent;
use outings_core::protocol::ServerEvent;

use crate::infra::PresenceStore;
use crate::realtime::{ConnectionId, Outgoing, RealtimeCore};

pub struct PresenceTracker {
    core: Arc<RealtimeCore>,
    store: Arc<dyn PresenceStore>,
}

impl PresenceTracker {
    pub fn new(core: Arc<RealtimeCore>, store: Arc<dyn PresenceStore>) -> Self {
        Self { core, store }
    }

    /// `true` when the user just came online.
    pub async fn mark_online(&self, user_id: &str) -> Result<bool> {
        self.store.connect(user_id).await
    }

    /// `true` when the user's last connection just closed.
    pub async fn mark_offline(&self, user_id: &str) -> Result<bool> {
        self.store.disconnect(user_id).await
    }

    pub async fn is_online(&self, user_id: &str) -> Result<bool> {
        self.store.is_online(user_id).await
    }

    /// Announce a transition to every connected client.
    pub async fn broadcast_presence(&self, user_id: &str, online: bool) -> Result<usize> {
        let ev = ServerEvent::Presence(PresenceEvent {
            user_id: user_id.to_string(),
            online,
        });
        self.core.broadcast_all(Outgoing::lossy(ev)).await
    }

    /// Answer a single peer's status to the requester only.
    pub async fn query_presence(&self, requester: &ConnectionId, peer_user_id: &str) -> Result<bool> {
        let online = self.is_online(peer_user_id).await?;
        let ev = ServerEvent::Presence(PresenceEvent {
            user_id: peer_user_id.to_string(),
            online,
        });
        self.core.send_to_connection(requester, Outgoing::lossy(ev)).await?;
        Ok(online)
    }
}
