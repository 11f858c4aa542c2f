use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use outings_core::error::{RealtimeError, Result};

/// Read-only view of `(userId, groupId)` memberships. Writes happen in the
/// CRUD layer; the realtime layer picks them up on refresh.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn group_ids_for(&self, user_id: &str) -> Result<Vec<String>>;

    async fn is_member(&self, user_id: &str, group_id: &str) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryMembershipStore {
    groups_by_user: DashMap<String, BTreeSet<String>>,
    unavailable: AtomicBool,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user_id: impl Into<String>, group_id: impl Into<String>) {
        self.groups_by_user
            .entry(user_id.into())
            .or_default()
            .insert(group_id.into());
    }

    pub fn remove(&self, user_id: &str, group_id: &str) {
        if let Some(mut set) = self.groups_by_user.get_mut(user_id) {
            set.remove(group_id);
        }
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(RealtimeError::Store("membership store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn group_ids_for(&self, user_id: &str) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self
            .groups_by_user
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn is_member(&self, user_id: &str, group_id: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .groups_by_user
            .get(user_id)
            .map(|set| set.contains(group_id))
            .unwrap_or(false))
    }
}
