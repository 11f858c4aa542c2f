//! Shared application state for the outings gateway.
//!
//! Wires the realtime core, the collaborator backends, and the services built
//! on them. Startup errors are returned, not panicked.

use std::sync::Arc;

use outings_core::error::Result;

use crate::config::GatewayConfig;
use crate::infra::{
    HttpPushGateway, InMemoryMembershipStore, InMemoryMessageStore, InMemoryPresence,
    InMemoryPushTokens, LogPushGateway, MembershipStore, MessageStore, PresenceStore, PushGateway,
    PushTokenStore,
};
use crate::obs::RealtimeMetrics;
use crate::realtime::RealtimeCore;
use crate::services::{
    MessagePipeline, PresenceTracker, ReadReceipts, RoomMembership, TypingNotifier,
};

/// External collaborators, injected.
#[derive(Clone)]
pub struct Backends {
    pub messages: Arc<dyn MessageStore>,
    pub memberships: Arc<dyn MembershipStore>,
    pub push_tokens: Arc<dyn PushTokenStore>,
    pub push: Arc<dyn PushGateway>,
    pub presence: Arc<dyn PresenceStore>,
}

impl Backends {
    /// Process-local stores; push goes to the configured relay, else the log.
    pub fn in_memory(cfg: &GatewayConfig) -> Result<Self> {
        let push: Arc<dyn PushGateway> = match &cfg.push.endpoint {
            Some(endpoint) => Arc::new(HttpPushGateway::new(endpoint.as_str(), cfg.push.timeout_ms)?),
            None => Arc::new(LogPushGateway),
        };
        Ok(Self {
            messages: Arc::new(InMemoryMessageStore::new()),
            memberships: Arc::new(InMemoryMembershipStore::new()),
            push_tokens: Arc::new(InMemoryPushTokens::new()),
            push,
            presence: Arc::new(InMemoryPresence::new()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    realtime: Arc<RealtimeCore>,
    metrics: Arc<RealtimeMetrics>,
    rooms: RoomMembership,
    presence: Arc<PresenceTracker>,
    messages: MessagePipeline,
    typing: TypingNotifier,
    receipts: ReadReceipts,
}

impl AppState {
    pub fn new(cfg: GatewayConfig, backends: Backends) -> Result<Self> {
        cfg.validate()?;

        let realtime = Arc::new(RealtimeCore::new());
        let metrics = Arc::new(RealtimeMetrics::default());
        let reliable_timeout_ms = cfg.messaging.reliable_timeout_ms;

        let rooms = RoomMembership::new(Arc::clone(&realtime), Arc::clone(&backends.memberships));
        let presence = Arc::new(PresenceTracker::new(
            Arc::clone(&realtime),
            Arc::clone(&backends.presence),
        ));
        let messages = MessagePipeline {
            core: Arc::clone(&realtime),
            store: Arc::clone(&backends.messages),
            presence: Arc::clone(&presence),
            push_tokens: Arc::clone(&backends.push_tokens),
            push: Arc::clone(&backends.push),
            metrics: Arc::clone(&metrics),
            sender_policy: cfg.messaging.sender_policy,
            reliable_timeout_ms,
            push_title: cfg.push.title.clone(),
        };
        let typing = TypingNotifier::new(Arc::clone(&realtime));
        let receipts = ReadReceipts::new(
            Arc::clone(&realtime),
            Arc::clone(&backends.messages),
            Arc::clone(&backends.memberships),
            reliable_timeout_ms,
        );

        tracing::info!(
            sender_policy = ?cfg.messaging.sender_policy,
            push_relay = cfg.push.endpoint.is_some(),
            "realtime services ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                realtime,
                metrics,
                rooms,
                presence,
                messages,
                typing,
                receipts,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn realtime(&self) -> Arc<RealtimeCore> {
        Arc::clone(&self.inner.realtime)
    }

    pub fn metrics(&self) -> &RealtimeMetrics {
        &self.inner.metrics
    }

    pub fn rooms(&self) -> &RoomMembership {
        &self.inner.rooms
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.inner.presence
    }

    pub fn messages(&self) -> &MessagePipeline {
        &self.inner.messages
    }

    pub fn typing(&self) -> &TypingNotifier {
        &self.inner.typing
    }

    pub fn receipts(&self) -> &ReadReceipts {
        &self.inner.receipts
    }

    pub fn reliable_timeout_ms(&self) -> u64 {
        self.inner.cfg.messaging.reliable_timeout_ms
    }

    /// Live gauges appended to the `/metrics` output.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        let core = &self.inner.realtime;
        vec![
            ("outings_connections", core.sessions.len() as u64),
            ("outings_rooms", core.rooms.room_count() as u64),
        ]
    }
}
