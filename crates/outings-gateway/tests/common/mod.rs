#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use outings_core::error::{RealtimeError, Result};
use outings_core::protocol::events::decode_text;
use outings_core::protocol::{ClientEvent, ServerEvent};
use outings_core::{ChatMessage, PushNotification};
use outings_gateway::app_state::{AppState, Backends};
use outings_gateway::config::GatewayConfig;
use outings_gateway::infra::{
    InMemoryMembershipStore, InMemoryMessageStore, InMemoryPresence, InMemoryPushTokens,
    PushGateway,
};
use outings_gateway::realtime::{ConnectionId, PreparedMsg};
use outings_gateway::services::Handshake;
use outings_gateway::session::{Session, SessionEvent};

/// Push gateway that keeps every notification it is handed.
#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<PushNotification>>,
    failing: AtomicBool,
}

impl RecordingPush {
    pub fn sent(&self) -> Vec<PushNotification> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

#[async_trait]
impl PushGateway for RecordingPush {
    async fn send(&self, notification: PushNotification) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(RealtimeError::Push("relay down".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification);
        }
        Ok(())
    }
}

pub struct Harness {
    pub app: AppState,
    pub messages: Arc<InMemoryMessageStore>,
    pub memberships: Arc<InMemoryMembershipStore>,
    pub tokens: Arc<InMemoryPushTokens>,
    pub push: Arc<RecordingPush>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(GatewayConfig::default(), InMemoryMessageStore::new())
    }

    pub fn with_config(cfg: GatewayConfig) -> Self {
        Self::build(cfg, InMemoryMessageStore::new())
    }

    pub fn with_message_store(store: InMemoryMessageStore) -> Self {
        Self::build(GatewayConfig::default(), store)
    }

    fn build(cfg: GatewayConfig, store: InMemoryMessageStore) -> Self {
        let messages = Arc::new(store);
        let memberships = Arc::new(InMemoryMembershipStore::new());
        let tokens = Arc::new(InMemoryPushTokens::new());
        let push = Arc::new(RecordingPush::default());

        let backends = Backends {
            messages: messages.clone(),
            memberships: memberships.clone(),
            push_tokens: tokens.clone(),
            push: push.clone(),
            presence: Arc::new(InMemoryPresence::new()),
        };
        let app = AppState::new(cfg, backends).expect("valid config");

        Self { app, messages, memberships, tokens, push }
    }

    pub async fn connect(&self, user: Option<&str>) -> Client {
        let handshake = match user {
            Some(u) => Handshake::with_user(u),
            None => Handshake::anonymous(),
        };
        self.connect_with(&handshake).await
    }

    pub async fn connect_with(&self, handshake: &Handshake) -> Client {
        let (tx, rx) = mpsc::channel::<PreparedMsg>(256);
        let session = Session::connect(self.app.clone(), ConnectionId::generate(), handshake, tx).await;
        let mut client = Client { session, outbox: Outbox { rx } };
        let events = client.drain();
        assert!(
            events.iter().any(|e| matches!(e, ServerEvent::Connected(_))),
            "connected event expected, got {events:?}"
        );
        client
    }
}

/// Build a client event the way the transport decodes it.
pub fn client_event(event: &str, data: Value) -> ClientEvent {
    let frame = serde_json::json!({ "v": 1, "type": event, "data": data });
    decode_text(&frame.to_string()).expect("valid client frame")
}

/// Outbound queue of one connection, read the way the socket writer would.
pub struct Outbox {
    rx: mpsc::Receiver<PreparedMsg>,
}

impl Outbox {
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        while let Ok(m) = self.rx.try_recv() {
            out.push(ServerEvent::from_frame(m.as_str()).expect("valid server frame"));
        }
        out
    }
}

/// Inbound side of a session running its own loop.
pub struct Actor {
    pub tx: mpsc::Sender<SessionEvent>,
    pub task: JoinHandle<()>,
}

impl Actor {
    pub async fn emit(&self, event: &str, data: Value) {
        self.tx
            .send(SessionEvent::Client(client_event(event, data)))
            .await
            .expect("actor alive");
    }
}

pub struct Client {
    pub session: Session,
    outbox: Outbox,
}

impl Client {
    pub async fn emit(&mut self, event: &str, data: Value) {
        self.session.handle(client_event(event, data)).await;
    }

    pub fn drain(&mut self) -> Vec<ServerEvent> {
        self.outbox.drain()
    }

    pub fn received_messages(&mut self) -> Vec<ChatMessage> {
        messages_in(self.drain())
    }

    pub async fn close(&mut self) {
        self.session.disconnect().await;
    }

    /// Move the session onto `Session::run`, fed through a bounded inbox.
    pub fn spawn(self) -> (Actor, Outbox) {
        let (tx, rx) = mpsc::channel::<SessionEvent>(64);
        let task = tokio::spawn(self.session.run(rx));
        (Actor { tx, task }, self.outbox)
    }
}

pub fn messages_in(events: Vec<ServerEvent>) -> Vec<ChatMessage> {
    events
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::ReceiveMessage(m) => Some(m),
            _ => None,
        })
        .collect()
}
