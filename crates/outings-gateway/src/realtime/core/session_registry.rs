use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::realtime::types::PreparedMsg;

/// Per-transport-session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    pub fn generate() -> Self {
        ConnectionId(Arc::from(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        ConnectionId(Arc::from(s))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One connection's outbound queue sender.
#[derive(Clone)]
pub struct Connection {
    pub user_id: Option<Arc<str>>,
    pub tx: mpsc::Sender<PreparedMsg>,
}

#[derive(Clone)]
struct SessionEntry {
    conn: Connection,
    created_seq: u64,
}

/// Connection registry: `connection_id -> Connection`.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<ConnectionId, SessionEntry>,
    seq: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    pub fn insert(&self, id: ConnectionId, conn: Connection) {
        let created_seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(id, SessionEntry { conn, created_seq });
    }

    pub fn remove(&self, id: &ConnectionId) -> Option<Connection> {
        self.sessions.remove(id).map(|(_, entry)| entry.conn)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Connection> {
        self.sessions.get(id).map(|r| r.value().conn.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of every live connection, oldest first.
    pub fn all(&self) -> Vec<(ConnectionId, Connection)> {
        let mut all: Vec<(u64, ConnectionId, Connection)> = self
            .sessions
            .iter()
            .map(|e| (e.value().created_seq, e.key().clone(), e.value().conn.clone()))
            .collect();
        all.sort_by_key(|(seq, _, _)| *seq);
        all.into_iter().map(|(_, id, conn)| (id, conn)).collect()
    }
}
