use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use outings_core::error::Result;

/// Authoritative set of online users.
///
/// Counts live connections per user so that a second device closing does not
/// mark the user offline. Injected as a service so a shared store can replace
/// the process-local one.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Register one live connection. `true` on the OFFLINE -> ONLINE transition.
    async fn connect(&self, user_id: &str) -> Result<bool>;

    /// Release one live connection. `true` on the ONLINE -> OFFLINE transition.
    async fn disconnect(&self, user_id: &str) -> Result<bool>;

    async fn is_online(&self, user_id: &str) -> Result<bool>;
}

/// Process-local presence. Empty at start; lost on restart.
#[derive(Default)]
pub struct InMemoryPresence {
    connections: DashMap<String, usize>,
}

impl InMemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresence {
    async fn connect(&self, user_id: &str) -> Result<bool> {
        let mut count = self.connections.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count == 1)
    }

    async fn disconnect(&self, user_id: &str) -> Result<bool> {
        // Decrement and removal share the shard lock held by the entry.
        match self.connections.entry(user_id.to_string()) {
            Entry::Occupied(mut e) => {
                if *e.get() <= 1 {
                    e.remove();
                    Ok(true)
                } else {
                    *e.get_mut() -= 1;
                    Ok(false)
                }
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn is_online(&self, user_id: &str) -> Result<bool> {
        Ok(self.connections.contains_key(user_id))
    }
}
