use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::time::{timeout, Duration};

use outings_core::error::{RealtimeError, Result};
use outings_core::RoomKey;

use crate::realtime::core::{Connection, ConnectionId, RoomIndex, SessionRegistry};
use crate::realtime::types::{Outgoing, PreparedMsg, QoS};

/// RealtimeCore: egress engine (send to connection / publish to rooms / broadcast).
pub struct RealtimeCore {
    pub sessions: Arc<SessionRegistry>,
    pub rooms: Arc<RoomIndex>,
}

impl Default for RealtimeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeCore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            rooms: Arc::new(RoomIndex::new()),
        }
    }

    /// Reply to exactly one connection.
    pub async fn send_to_connection(&self, id: &ConnectionId, out: Outgoing) -> Result<()> {
        let conn = self
            .sessions
            .get(id)
            .ok_or_else(|| RealtimeError::NotFound(format!("connection {id}")))?;
        let prepared = PreparedMsg::prepare(&out)?;
        deliver(vec![(id.clone(), conn)], prepared, out.qos).await;
        Ok(())
    }

    /// Publish to the union of several rooms. A connection joined to more
    /// than one of them receives a single copy. Returns the recipient count.
    pub async fn publish_rooms(&self, rooms: &[RoomKey], out: Outgoing) -> Result<usize> {
        let prepared = PreparedMsg::prepare(&out)?;

        let mut targets: BTreeMap<ConnectionId, Connection> = BTreeMap::new();
        for room in rooms {
            for id in self.rooms.connections_in(room) {
                if targets.contains_key(&id) {
                    continue;
                }
                if let Some(conn) = self.sessions.get(&id) {
                    targets.insert(id, conn);
                }
            }
        }

        let n = targets.len();
        deliver(targets.into_iter().collect(), prepared, out.qos).await;
        Ok(n)
    }

    pub async fn publish_room(&self, room: &RoomKey, out: Outgoing) -> Result<usize> {
        self.publish_rooms(std::slice::from_ref(room), out).await
    }

    /// Every live connection, scoped to no room.
    pub async fn broadcast_all(&self, out: Outgoing) -> Result<usize> {
        let prepared = PreparedMsg::prepare(&out)?;
        let targets = self.sessions.all();
        let n = targets.len();
        deliver(targets, prepared, out.qos).await;
        Ok(n)
    }
}

/// Lossy: try_send only, drop if the queue is full.
/// Reliable: send concurrently, each bounded by the QoS timeout.
async fn deliver(targets: Vec<(ConnectionId, Connection)>, prepared: PreparedMsg, qos: QoS) {
    match qos {
        QoS::Lossy => {
            for (id, conn) in targets {
                if conn.tx.try_send(prepared.clone()).is_err() {
                    tracing::debug!(conn = %id, "lossy send dropped");
                }
            }
        }
        QoS::Reliable { timeout_ms } => {
            let mut futs = FuturesUnordered::new();
            for (id, conn) in targets {
                let msg = prepared.clone();
                futs.push(async move {
                    let sent = if timeout_ms > 0 {
                        matches!(
                            timeout(Duration::from_millis(timeout_ms), conn.tx.send(msg)).await,
                            Ok(Ok(()))
                        )
                    } else {
                        conn.tx.send(msg).await.is_ok()
                    };
                    if !sent {
                        tracing::warn!(conn = %id, "reliable send failed or timed out");
                    }
                });
            }
            while futs.next().await.is_some() {}
        }
    }
}
