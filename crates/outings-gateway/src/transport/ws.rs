//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS
//! - Build the identity handshake from the `x-user-id` header and `?userId=`
//! - Run the connection actor and pump its outbound queue to the socket
//! - Lifecycle: ping + idle timeout (the liveness signal that ends a session)
//! - Size check, then decode once; malformed frames are dropped, never fatal

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    http::HeaderMap,
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use outings_core::error::Result;

use crate::app_state::AppState;
use crate::realtime::{ConnectionId, PreparedMsg};
use crate::services::Handshake;
use crate::session::{Session, SessionEvent};
use crate::transport::codec::{decode, frame_len, Inbound};

/// Handshake header carrying the authenticated user id.
pub const AUTH_USER_HEADER: &str = "x-user-id";

/// Inbound events buffered per connection before the reader waits.
const SESSION_INBOX: usize = 64;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

pub fn handshake_from(headers: &HeaderMap, q: WsQuery) -> Handshake {
    Handshake {
        auth_user_id: headers
            .get(AUTH_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query_user_id: q.user_id,
    }
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    app.metrics().ws_upgrades.inc(&[]);
    let handshake = handshake_from(&headers, q);

    ws.on_upgrade(move |socket| async move {
        let conn = ConnectionId::generate();
        let span = tracing::info_span!("ws", conn = %conn);
        if let Err(e) = run_session(app, conn, handshake, socket).instrument(span).await {
            tracing::warn!(error = %e, "ws session ended with error");
        }
    })
}

async fn run_session(app: AppState, conn: ConnectionId, handshake: Handshake, socket: WebSocket) -> Result<()> {
    let gw = app.cfg().gateway.clone();

    let (out_tx, mut out_rx) = mpsc::channel::<PreparedMsg>(gw.outbound_queue);
    let (ev_tx, ev_rx) = mpsc::channel::<SessionEvent>(SESSION_INBOX);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let session = Session::connect(app.clone(), conn, &handshake, out_tx).await;
    let actor = tokio::spawn(session.run(ev_rx).in_current_span());

    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);
    let mut ping_tick = tokio::time::interval(Duration::from_millis(gw.ping_interval_ms));
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                if ws_tx.send(m.to_ws_message()).await.is_err() {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                if frame_len(&msg) > gw.max_frame_bytes {
                    app.metrics().decode_errors.inc(&[("reason", "too_large")]);
                    tracing::debug!("oversized frame dropped");
                    continue;
                }

                match decode(msg) {
                    Ok(Inbound::Event(ev)) => {
                        let ev = SessionEvent::Client(ev);
                        if !forward(&ev_tx, ev, &mut out_rx, &mut ws_tx).await {
                            break;
                        }
                    }
                    Ok(Inbound::Ping(payload)) => {
                        let _ = ws_tx.send(Message::Pong(payload)).await;
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        app.metrics().decode_errors.inc(&[("reason", e.client_code().as_str())]);
                        tracing::debug!(error = %e, "malformed frame dropped");
                    }
                }
            }

            // ping + idle timeout
            _ = ping_tick.tick() => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!("idle timeout");
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    close_session(out_rx, ev_tx, actor).await;
    let _ = ws_tx.close().await;
    Ok(())
}

/// Hand one event to the actor while still draining its outbound queue.
///
/// The actor may be blocked on a reliable send to this same connection; a
/// full inbox must not wait on it. `false` once either side is gone.
async fn forward(
    ev_tx: &mpsc::Sender<SessionEvent>,
    ev: SessionEvent,
    out_rx: &mut mpsc::Receiver<PreparedMsg>,
    ws_tx: &mut SplitSink<WebSocket, Message>,
) -> bool {
    let send = ev_tx.send(ev);
    tokio::pin!(send);
    loop {
        tokio::select! {
            res = &mut send => return res.is_ok(),
            Some(m) = out_rx.recv() => {
                if ws_tx.send(m.to_ws_message()).await.is_err() {
                    return false;
                }
            }
        }
    }
}

/// Tear the actor down once the socket is gone.
///
/// The outbound queue is closed first so every send still aimed at this
/// connection fails at once instead of waiting out its reliable timeout.
/// Presence flips offline as soon as the actor has worked through its inbox.
async fn close_session(
    out_rx: mpsc::Receiver<PreparedMsg>,
    ev_tx: mpsc::Sender<SessionEvent>,
    actor: JoinHandle<()>,
) {
    drop(out_rx);
    let _ = ev_tx.send(SessionEvent::Disconnect).await;
    drop(ev_tx);
    if let Err(e) = actor.await {
        tracing::error!(error = %e, "session actor panicked");
    }
}
