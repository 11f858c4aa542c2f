use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use outings_core::error::{RealtimeError, Result};
use outings_core::{ChatMessage, MessageDraft};

/// Persistent message storage (owned by the data-mapping layer).
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a draft; the store assigns `id` and `createdAt`.
    async fn create(&self, draft: MessageDraft) -> Result<ChatMessage>;

    async fn get(&self, id: &str) -> Result<Option<ChatMessage>>;

    /// Set `isRead` and `readAt`. Fails with `Unsupported` on schemas
    /// without a read timestamp.
    async fn mark_read(&self, id: &str, at: DateTime<Utc>) -> Result<ChatMessage>;

    /// Set `isRead` only.
    async fn mark_read_flag_only(&self, id: &str) -> Result<ChatMessage>;
}

pub struct InMemoryMessageStore {
    messages: DashMap<String, ChatMessage>,
    read_at_supported: bool,
    unavailable: AtomicBool,
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            read_at_supported: true,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Reduced schema: no read timestamp column.
    pub fn without_read_at() -> Self {
        Self {
            read_at_supported: false,
            ..Self::new()
        }
    }

    /// Simulate an outage: every call fails with `Store`.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(RealtimeError::Store("message store unavailable".into()));
        }
        Ok(())
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut ChatMessage)) -> Result<ChatMessage> {
        let mut entry = self
            .messages
            .get_mut(id)
            .ok_or_else(|| RealtimeError::NotFound(format!("message {id}")))?;
        f(entry.value_mut());
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(&self, draft: MessageDraft) -> Result<ChatMessage> {
        self.check_available()?;
        let msg = ChatMessage::from_draft(Uuid::new_v4().to_string(), Utc::now(), draft);
        self.messages.insert(msg.id.clone(), msg.clone());
        Ok(msg)
    }

    async fn get(&self, id: &str) -> Result<Option<ChatMessage>> {
        self.check_available()?;
        Ok(self.messages.get(id).map(|m| m.value().clone()))
    }

    async fn mark_read(&self, id: &str, at: DateTime<Utc>) -> Result<ChatMessage> {
        self.check_available()?;
        if !self.read_at_supported {
            return Err(RealtimeError::Unsupported("readAt column".into()));
        }
        self.update(id, |m| {
            m.is_read = true;
            m.read_at = Some(at);
        })
    }

    async fn mark_read_flag_only(&self, id: &str) -> Result<ChatMessage> {
        self.check_available()?;
        self.update(id, |m| m.is_read = true)
    }
}
