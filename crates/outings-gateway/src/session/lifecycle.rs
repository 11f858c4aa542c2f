use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use outings_core::error::{ClientCode, RealtimeError, Result};
use outings_core::protocol::outbound::{ConnectedEvent, ErrorEvent};
use outings_core::protocol::{ClientEvent, ServerEvent};

use crate::app_state::AppState;
use crate::realtime::{Connection, ConnectionId, Outgoing, PreparedMsg};
use crate::services::{resolve_identity, Handshake};

/// Inbound work for one connection's loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Client(ClientEvent),
    Disconnect,
}

/// CONNECTING -> CONNECTED -> DISCONNECTED (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Connected,
    Disconnected,
}

pub struct Session {
    app: AppState,
    conn: ConnectionId,
    user_id: Option<String>,
    phase: Phase,
}

impl Session {
    /// Register the connection and finish room setup.
    ///
    /// Group rooms are joined before the `connected` event is queued, so a
    /// client never sees "ready" ahead of its group traffic.
    pub async fn connect(
        app: AppState,
        conn: ConnectionId,
        handshake: &Handshake,
        tx: mpsc::Sender<PreparedMsg>,
    ) -> Self {
        let user_id = resolve_identity(handshake);
        let mut session = Self {
            app,
            conn,
            user_id,
            phase: Phase::Connecting,
        };

        let core = session.app.realtime();
        core.sessions.insert(
            session.conn.clone(),
            Connection {
                user_id: session.user_id.as_deref().map(Arc::from),
                tx,
            },
        );
        session.app.metrics().sessions_active.inc(&[]);

        if let Some(user) = session.user_id.clone() {
            session.attach_user(&user).await;
        }

        session.phase = Phase::Connected;
        let ready = ServerEvent::Connected(ConnectedEvent {
            user_id: session.user_id.clone(),
        });
        session.reply(ready).await;

        tracing::info!(conn = %session.conn, user = ?session.user_id, "connected");
        session
    }

    async fn attach_user(&self, user: &str) {
        let app = &self.app;
        app.rooms().join_user_room(&self.conn, user);

        match app.presence().mark_online(user).await {
            Ok(true) => {
                if let Err(e) = app.presence().broadcast_presence(user, true).await {
                    tracing::warn!(user, error = %e, "presence broadcast failed");
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(user, error = %e, "mark online failed"),
        }

        if let Err(e) = app.rooms().join_all_group_rooms(&self.conn, user).await {
            tracing::warn!(conn = %self.conn, user, error = %e, "joining group rooms failed");
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.conn
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Consume events until `Disconnect` or the channel closes, then tear down.
    pub async fn run(mut self, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(ev) = rx.recv().await {
            match ev {
                SessionEvent::Client(ev) => self.handle(ev).await,
                SessionEvent::Disconnect => break,
            }
        }
        self.disconnect().await;
    }

    /// Run one client event to completion. Failures never end the session.
    pub async fn handle(&mut self, ev: ClientEvent) {
        if self.phase != Phase::Connected {
            tracing::debug!(conn = %self.conn, event = ev.name(), "event after disconnect ignored");
            return;
        }

        let name = ev.name();
        let started = Instant::now();
        let res = self.dispatch(ev).await;

        let metrics = self.app.metrics();
        metrics.events.inc(&[("event", name)]);
        metrics.dispatch_duration.observe(&[("event", name)], started.elapsed());

        if let Err(e) = res {
            self.report(name, e).await;
        }
    }

    async fn dispatch(&self, ev: ClientEvent) -> Result<()> {
        let app = self.app.clone();
        let user = self.user_id.as_deref();

        match ev {
            ClientEvent::Typing(req) => {
                app.typing().relay(user, req).await?;
            }
            ClientEvent::SendMessage(req) => {
                app.messages().send(user, req).await?;
            }
            ClientEvent::ReadMessage(req) => {
                let Some(message_id) = req.message_id else { return Ok(()) };
                app.receipts().mark_read(user, &message_id).await?;
            }
            ClientEvent::JoinGroup(req) => {
                if let (Some(_), Some(gid)) = (user, req.group_id) {
                    app.rooms().join_group(&self.conn, &gid);
                    tracing::debug!(conn = %self.conn, room = %format!("group:{gid}"), "joined");
                }
            }
            ClientEvent::LeaveGroup(req) => {
                if let (Some(_), Some(gid)) = (user, req.group_id) {
                    app.rooms().leave_group(&self.conn, &gid);
                    tracing::debug!(conn = %self.conn, room = %format!("group:{gid}"), "left");
                }
            }
            ClientEvent::RefreshGroups => {
                if let Some(user) = user {
                    let n = app.rooms().refresh_group_rooms(&self.conn, user).await?;
                    tracing::debug!(conn = %self.conn, user, groups = n, "refreshed group rooms");
                }
            }
            ClientEvent::PresenceQuery(req) => {
                if let Some(peer) = req.peer_user_id {
                    app.presence().query_presence(&self.conn, &peer).await?;
                }
            }
        }
        Ok(())
    }

    /// Participation and lookup failures go back to the requester; every
    /// other failure is only logged.
    async fn report(&self, event: &'static str, err: RealtimeError) {
        match err.client_code() {
            ClientCode::NotAllowed | ClientCode::NotFound => {
                tracing::debug!(conn = %self.conn, event, error = %err, "rejected");
                self.reply(ServerEvent::Error(ErrorEvent::from_error(&err))).await;
            }
            _ => {
                tracing::warn!(conn = %self.conn, user = ?self.user_id, event, error = %err, "event handling failed");
            }
        }
    }

    async fn reply(&self, ev: ServerEvent) {
        let out = Outgoing::reliable(ev, self.app.reliable_timeout_ms());
        if let Err(e) = self.app.realtime().send_to_connection(&self.conn, out).await {
            tracing::debug!(conn = %self.conn, error = %e, "reply dropped");
        }
    }

    /// Idempotent teardown: leave every room, then flip presence if this
    /// was the user's last connection.
    pub async fn disconnect(&mut self) {
        if self.phase == Phase::Disconnected {
            return;
        }
        self.phase = Phase::Disconnected;

        let app = self.app.clone();
        app.realtime().sessions.remove(&self.conn);
        let rooms = app.rooms().leave_all(&self.conn);
        app.metrics().sessions_active.dec(&[]);

        if let Some(user) = self.user_id.as_deref() {
            match app.presence().mark_offline(user).await {
                Ok(true) => {
                    if let Err(e) = app.presence().broadcast_presence(user, false).await {
                        tracing::warn!(user, error = %e, "presence broadcast failed");
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(user, error = %e, "mark offline failed"),
            }
        }

        tracing::info!(conn = %self.conn, user = ?self.user_id, rooms = rooms.len(), "disconnected");
    }
}
