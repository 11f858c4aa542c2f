//! Outings realtime gateway.
//!
//! - WebSocket endpoint: /v1/ws?userId=... (or `x-user-id` header)
//! - Presence, typing, chat fan-out and read receipts over one connection
//! - Push fallback for offline direct-message recipients

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use outings_core::error::{RealtimeError, Result};
use outings_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::load_from_env()?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| RealtimeError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}")))?;

    let backends = app_state::Backends::in_memory(&cfg)?;
    let state = app_state::AppState::new(cfg, backends)?;
    let app = router::build_router(state);

    tracing::info!(%listen, "outings-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RealtimeError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RealtimeError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
