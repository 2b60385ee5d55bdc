//! Client registry: seat assignment, version compatibility, and outbound
//! fan-out.
//!
//! The registry is a thin map owned by the session task; every lifecycle
//! decision funnels through the session's event queue, so no locking is
//! needed here. Outbound sends never block the turn loop: a client that
//! cannot drain its bounded queue loses those messages.

use tokio::sync::mpsc;
use tracing::warn;

use pawnstorm_protocol::{PlayerId, ServerMessage};
use serde::Deserialize;

/// Connect metadata carried in the transport's URL query string.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Opaque label, used for logging only.
    pub callsign: String,
    /// Advisory client build string.
    #[serde(default)]
    pub client_version: Option<String>,
    /// Protocol major the client expects the server to speak.
    pub expected_server_version: u32,
}

/// Transport-side handle to one connection: the id the transport assigned
/// plus the bounded queue its writer task drains.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    conn_id: u64,
    sender: mpsc::Sender<ServerMessage>,
}

impl ClientHandle {
    pub fn new(conn_id: u64, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { conn_id, sender }
    }

    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Queue a message without blocking. Returns false when the queue is
    /// full or the socket is gone; the caller treats the message as lost.
    pub fn push(&self, message: ServerMessage) -> bool {
        self.sender.try_send(message).is_ok()
    }
}

/// One assigned seat.
#[derive(Clone, Debug)]
pub struct PlayerBinding {
    pub player_id: PlayerId,
    pub callsign: String,
    pub client_version: Option<String>,
    pub expected_server_version: u32,
    pub connected: bool,
    handle: ClientHandle,
}

/// Why a connection was refused a seat.
#[derive(Clone, Debug, thiserror::Error)]
pub enum JoinError {
    #[error("session already has two players")]
    SessionFull,
    #[error("incompatible protocol version: client expects {expected}, server speaks {server}")]
    VersionMismatch { expected: u32, server: u32 },
}

/// Maps the two seats to their transport handles. `player1`/`player2`
/// are handed out in arrival order; a third connection is refused until
/// the session terminates.
#[derive(Debug)]
pub struct ClientRegistry {
    server_version: u32,
    seats: [Option<PlayerBinding>; 2],
    started: bool,
}

impl ClientRegistry {
    pub fn new(server_version: u32) -> Self {
        Self {
            server_version,
            seats: [None, None],
            started: false,
        }
    }

    /// Compatibility-check the handshake and bind the next free seat.
    pub fn register(
        &mut self,
        handshake: Handshake,
        handle: ClientHandle,
    ) -> Result<PlayerId, JoinError> {
        if handshake.expected_server_version != self.server_version {
            return Err(JoinError::VersionMismatch {
                expected: handshake.expected_server_version,
                server: self.server_version,
            });
        }
        let Some(seat) = self.seats.iter().position(Option::is_none) else {
            return Err(JoinError::SessionFull);
        };
        if self.started {
            // Seats freed after start stay closed; no mid-game joins.
            return Err(JoinError::SessionFull);
        }

        let player_id = PlayerId::PAIR[seat];
        self.seats[seat] = Some(PlayerBinding {
            player_id,
            callsign: handshake.callsign,
            client_version: handshake.client_version,
            expected_server_version: handshake.expected_server_version,
            connected: true,
            handle,
        });
        Ok(player_id)
    }

    /// The ready-gate: two compatible clients attached and connected.
    pub fn ready(&self) -> bool {
        self.seats
            .iter()
            .all(|seat| seat.as_ref().is_some_and(|b| b.connected))
    }

    /// Freeze seat assignment once the session leaves the lobby.
    pub fn mark_started(&mut self) {
        self.started = true;
    }

    pub fn player_by_conn(&self, conn_id: u64) -> Option<PlayerId> {
        self.bindings()
            .find(|b| b.connected && b.handle.conn_id == conn_id)
            .map(|b| b.player_id)
    }

    /// Mid-game disconnect: the seat stays bound, the player submits
    /// implicitly empty action sets from now on.
    pub fn mark_disconnected(&mut self, conn_id: u64) -> Option<PlayerId> {
        let binding = self
            .seats
            .iter_mut()
            .flatten()
            .find(|b| b.connected && b.handle.conn_id == conn_id)?;
        binding.connected = false;
        Some(binding.player_id)
    }

    /// Pre-start disconnect: vacate the seat so the next arrival can
    /// take it.
    pub fn remove_by_conn(&mut self, conn_id: u64) -> Option<PlayerId> {
        for seat in &mut self.seats {
            if seat
                .as_ref()
                .is_some_and(|b| b.handle.conn_id == conn_id)
            {
                return seat.take().map(|b| b.player_id);
            }
        }
        None
    }

    pub fn is_connected(&self, player: PlayerId) -> bool {
        self.binding(player).is_some_and(|b| b.connected)
    }

    pub fn connected_count(&self) -> usize {
        self.bindings().filter(|b| b.connected).count()
    }

    pub fn callsign(&self, player: PlayerId) -> Option<&str> {
        self.binding(player).map(|b| b.callsign.as_str())
    }

    /// Unicast. Returns false when the message was lost.
    pub fn send(&self, player: PlayerId, message: ServerMessage) -> bool {
        let Some(binding) = self.binding(player) else {
            return false;
        };
        if !binding.connected {
            return false;
        }
        let delivered = binding.handle.push(message);
        if !delivered {
            warn!(player = %player, "outbound queue full or closed; message lost");
        }
        delivered
    }

    pub fn broadcast(&self, message: ServerMessage) {
        for binding in self.bindings() {
            if binding.connected {
                self.send(binding.player_id, message.clone());
            }
        }
    }

    pub fn bindings(&self) -> impl Iterator<Item = &PlayerBinding> {
        self.seats.iter().flatten()
    }

    fn binding(&self, player: PlayerId) -> Option<&PlayerBinding> {
        self.seats
            .get(player.0 as usize)
            .and_then(Option::as_ref)
    }
}
