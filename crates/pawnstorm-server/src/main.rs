//! Pawnstorm server binary.
//!
//! Hosts exactly one two-player session: bind the WebSocket listener,
//! run the session to termination, exit. Exit code 0 on a normal end,
//! 1 on a startup failure.

use tokio::sync::mpsc;
use tracing::{error, info};

use pawnstorm_server::{transport, GameSession, ServerConfig, SessionEvent};

/// Depth of the single inbound queue feeding the session task.
const SESSION_QUEUE: usize = 256;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pawnstorm_server=info".into()),
        )
        .init();

    let config = ServerConfig::default();
    let (events_tx, events_rx) = mpsc::channel(SESSION_QUEUE);

    let session = match GameSession::new(config.clone(), events_rx) {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "startup failed");
            std::process::exit(1);
        }
    };

    info!(
        "pawnstorm-server v{} (protocol {})",
        env!("CARGO_PKG_VERSION"),
        config.protocol_version
    );

    // Ctrl-C funnels through the same queue as every other event.
    let shutdown_tx = events_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(SessionEvent::Shutdown).await;
        }
    });

    let mut session_task = tokio::spawn(session.run());

    tokio::select! {
        result = transport::serve(config.bind_address, events_tx) => {
            // serve() only returns on failure; the bind error is the
            // startup-failure path.
            if let Err(err) = result {
                error!(error = %err, "transport failed");
                std::process::exit(1);
            }
        }
        _ = &mut session_task => {
            info!("session terminated; shutting down");
        }
    }
}
