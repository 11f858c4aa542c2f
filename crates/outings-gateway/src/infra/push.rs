//! Push notification collaborators.
//!
//! The realtime layer decides *whether* to push and *what* to send; delivery
//! belongs to a third-party gateway reached through `PushGateway`.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use outings_core::error::{RealtimeError, Result};
use outings_core::PushNotification;

/// Per-user device token lookup (registered through the CRUD layer).
#[async_trait]
pub trait PushTokenStore: Send + Sync {
    async fn push_token(&self, user_id: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, notification: PushNotification) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryPushTokens {
    tokens: DashMap<String, String>,
}

impl InMemoryPushTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a token; blank tokens unregister.
    pub fn set(&self, user_id: impl Into<String>, token: impl Into<String>) {
        let user_id = user_id.into();
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            self.tokens.remove(&user_id);
        } else {
            self.tokens.insert(user_id, token.to_string());
        }
    }
}

#[async_trait]
impl PushTokenStore for InMemoryPushTokens {
    async fn push_token(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.tokens.get(user_id).map(|t| t.value().clone()))
    }
}

/// Logs notifications instead of delivering them (no relay configured).
#[derive(Default)]
pub struct LogPushGateway;

#[async_trait]
impl PushGateway for LogPushGateway {
    async fn send(&self, notification: PushNotification) -> Result<()> {
        tracing::info!(
            recipient = %notification.data.recipient_id,
            message_id = %notification.data.message_id,
            title = %notification.notification.title,
            "push (log-only)"
        );
        Ok(())
    }
}

/// POSTs the notification JSON to an HTTP push relay.
pub struct HttpPushGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushGateway {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| RealtimeError::Internal(format!("push client build failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send(&self, notification: PushNotification) -> Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&notification)
            .send()
            .await
            .map_err(|e| RealtimeError::Push(format!("relay unreachable: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RealtimeError::Push(format!("relay returned {status}")));
        }
        Ok(())
    }
}
