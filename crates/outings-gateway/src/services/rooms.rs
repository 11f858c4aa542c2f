//! Room membership manager.
//!
//! One private `user:<id>` room per known user and one `group:<id>` room per
//! membership. Group rooms are derived from the membership store at connect
//! time and on explicit refresh; `join_group`/`leave_group` adjust a single
//! room without consulting the store, so a connection can drift until its
//! next refresh.

use std::sync::Arc;

use outings_core::error::Result;
use outings_core::RoomKey;

use crate::infra::MembershipStore;
use crate::realtime::{ConnectionId, RealtimeCore};

pub struct RoomMembership {
    core: Arc<RealtimeCore>,
    memberships: Arc<dyn MembershipStore>,
}

impl RoomMembership {
    pub fn new(core: Arc<RealtimeCore>, memberships: Arc<dyn MembershipStore>) -> Self {
        Self { core, memberships }
    }

    pub fn join_user_room(&self, conn: &ConnectionId, user_id: &str) {
        self.core.rooms.join(&RoomKey::user(user_id), conn);
    }

    /// Join every group room the store lists for `user_id`. Returns how many.
    pub async fn join_all_group_rooms(&self, conn: &ConnectionId, user_id: &str) -> Result<usize> {
        let group_ids = self.memberships.group_ids_for(user_id).await?;
        for gid in &group_ids {
            self.core.rooms.join(&RoomKey::group(gid.as_str()), conn);
        }
        tracing::debug!(conn = %conn, user = %user_id, groups = group_ids.len(), "joined group rooms");
        Ok(group_ids.len())
    }

    pub fn join_group(&self, conn: &ConnectionId, group_id: &str) {
        self.core.rooms.join(&RoomKey::group(group_id), conn);
    }

    pub fn leave_group(&self, conn: &ConnectionId, group_id: &str) {
        self.core.rooms.leave(&RoomKey::group(group_id), conn);
    }

    /// Re-derive group rooms from the store.
    ///
    /// The store is queried before anything is left: if the query fails the
    /// connection keeps its current group rooms.
    pub async fn refresh_group_rooms(&self, conn: &ConnectionId, user_id: &str) -> Result<usize> {
        let group_ids = self.memberships.group_ids_for(user_id).await?;

        for room in self.group_rooms_of(conn) {
            self.core.rooms.leave(&room, conn);
        }
        for gid in &group_ids {
            self.core.rooms.join(&RoomKey::group(gid.as_str()), conn);
        }
        Ok(group_ids.len())
    }

    pub fn group_rooms_of(&self, conn: &ConnectionId) -> Vec<RoomKey> {
        self.core
            .rooms
            .rooms_of(conn)
            .into_iter()
            .filter(RoomKey::is_group)
            .collect()
    }

    /// Rooms are implicit; dropping the connection's memberships is all the
    /// teardown there is.
    pub fn leave_all(&self, conn: &ConnectionId) -> Vec<RoomKey> {
        self.core.rooms.cleanup_connection(conn)
    }
}
