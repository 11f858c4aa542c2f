use dashmap::{DashMap, DashSet};

use outings_core::RoomKey;

use super::ConnectionId;

/// Room membership index: room -> connections, connection -> rooms.
///
/// Rooms have no owner; a room disappears as soon as its last connection
/// leaves or disconnects.
#[derive(Default)]
pub struct RoomIndex {
    room_to_conns: DashMap<RoomKey, DashSet<ConnectionId>>,
    conn_to_rooms: DashMap<ConnectionId, DashSet<RoomKey>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self {
            room_to_conns: DashMap::new(),
            conn_to_rooms: DashMap::new(),
        }
    }

    /// Idempotent.
    pub fn join(&self, room: &RoomKey, conn: &ConnectionId) {
        self.room_to_conns
            .entry(room.clone())
            .or_default()
            .insert(conn.clone());

        self.conn_to_rooms
            .entry(conn.clone())
            .or_default()
            .insert(room.clone());
    }

    pub fn leave(&self, room: &RoomKey, conn: &ConnectionId) {
        if let Some(set) = self.room_to_conns.get(room) {
            set.remove(conn);
        }
        self.room_to_conns.remove_if(room, |_, set| set.is_empty());

        if let Some(set) = self.conn_to_rooms.get(conn) {
            set.remove(room);
        }
        self.conn_to_rooms.remove_if(conn, |_, set| set.is_empty());
    }

    pub fn connections_in(&self, room: &RoomKey) -> Vec<ConnectionId> {
        self.room_to_conns
            .get(room)
            .map(|set| set.iter().map(|c| c.key().clone()).collect())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, conn: &ConnectionId) -> Vec<RoomKey> {
        let mut rooms: Vec<RoomKey> = self
            .conn_to_rooms
            .get(conn)
            .map(|set| set.iter().map(|r| r.key().clone()).collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn is_member(&self, room: &RoomKey, conn: &ConnectionId) -> bool {
        self.room_to_conns
            .get(room)
            .map(|set| set.contains(conn))
            .unwrap_or(false)
    }

    pub fn room_count(&self) -> usize {
        self.room_to_conns.len()
    }

    /// Drop every membership of a closed connection.
    pub fn cleanup_connection(&self, conn: &ConnectionId) -> Vec<RoomKey> {
        let Some((_, rooms)) = self.conn_to_rooms.remove(conn) else {
            return Vec::new();
        };
        let rooms: Vec<RoomKey> = rooms.into_iter().collect();
        for room in &rooms {
            if let Some(set) = self.room_to_conns.get(room) {
                set.remove(conn);
            }
            self.room_to_conns.remove_if(room, |_, set| set.is_empty());
        }
        rooms
    }
}
