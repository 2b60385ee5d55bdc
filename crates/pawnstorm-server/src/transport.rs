//! WebSocket transport adapter.
//!
//! The only layer that sees bytes. Each accepted socket splits into a
//! reader that decodes JSON frames into [`SessionEvent`]s and a writer
//! that drains the client's outbound queue; when either side finishes the
//! other is aborted and the session is told the connection is gone. The
//! session signals rejection by dropping the handle, which closes the
//! socket after the queue drains.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use pawnstorm_protocol::{wire, ServerMessage};

use crate::registry::{ClientHandle, Handshake};
use crate::session::SessionEvent;

/// Outbound queue depth per client. A client that cannot drain this many
/// messages within a turn loses them, and with them the turn.
const OUTBOUND_BUFFER: usize = 64;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[derive(Clone)]
struct TransportState {
    events: mpsc::Sender<SessionEvent>,
}

/// The session endpoint. Connect metadata rides the query string:
/// `/game?callsign=ada&clientVersion=0.1.0&expectedServerVersion=1`.
pub fn router(events: mpsc::Sender<SessionEvent>) -> Router {
    Router::new()
        .route("/game", get(connect_handler))
        .with_state(TransportState { events })
}

/// Bind and serve until the process ends.
pub async fn serve(
    addr: SocketAddr,
    events: mpsc::Sender<SessionEvent>,
) -> Result<(), TransportError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::BindFailed(addr, e))?;
    info!("listening on {addr}");
    axum::serve(listener, router(events))
        .await
        .map_err(TransportError::Serve)
}

async fn connect_handler(
    ws: WebSocketUpgrade,
    Query(handshake): Query<Handshake>,
    State(state): State<TransportState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| drive_socket(socket, handshake, state))
}

/// One connection from handshake to teardown.
async fn drive_socket(socket: WebSocket, handshake: Handshake, state: TransportState) {
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    let connected = state.events.send(SessionEvent::Connected {
        handshake,
        handle: ClientHandle::new(conn_id, outbound_tx),
    });
    if connected.await.is_err() {
        // Session is gone; nothing to attach to.
        return;
    }

    // Splitting lets the two directions run at the same time.
    let (sink, stream) = socket.split();
    let mut write_task = tokio::spawn(write_loop(sink, outbound_rx));
    let mut read_task = tokio::spawn(read_loop(stream, conn_id, state.events.clone()));

    // Whichever side finishes first tears the other down.
    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    let _ = state
        .events
        .send(SessionEvent::Disconnected { conn_id })
        .await;
}

/// Drain the session's outbound queue onto the socket.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let frame = match wire::encode_server_message(&message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "unencodable outbound message dropped");
                continue;
            }
        };
        if sink.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    // The session dropped the handle: close the socket cleanly.
    let _ = sink.send(Message::Close(None)).await;
}

/// Decode inbound frames and forward them to the session queue. A frame
/// the codec rejects is a protocol error; the connection is closed.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    conn_id: u64,
    events: mpsc::Sender<SessionEvent>,
) {
    while let Some(frame) = stream.next().await {
        let Ok(frame) = frame else {
            return;
        };
        match frame {
            Message::Text(text) => match wire::decode_client_message(text.as_str()) {
                Ok(message) => {
                    if events
                        .send(SessionEvent::Inbound { conn_id, message })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Err(err) => {
                    warn!(conn_id, error = %err, "malformed frame; closing connection");
                    return;
                }
            },
            Message::Close(_) => return,
            // Ping/pong are answered by axum itself.
            _ => {}
        }
    }
}
