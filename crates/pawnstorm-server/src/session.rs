//! The turn coordinator: one task owning the authoritative game.
//!
//! The session moves through `WAITING_FOR_PLAYERS → STARTING →
//! AWAITING_ACTIONS → APPLYING → … → TERMINATED`. Every inbound path
//! (connects, disconnects, decoded frames, shutdown) funnels through a
//! single mpsc queue, so the engine, registry, RNG, and history have
//! exactly one owner and no locks. The per-turn deadline is absolute,
//! fixed at the moment `NEXT_TURN` goes out; expiry proceeds with
//! whichever submissions arrived.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use pawnstorm_core::arena::{self, Arena, ArenaError};
use pawnstorm_core::{
    validate_actions, EndRules, EngineConfig, EngineError, GameEngine, GameOutcome, TurnOrders,
};
use pawnstorm_protocol::{
    Action, ClientMessage, GameEnd, GameLog, GameStart, LogPlayer, PlayerId, ServerMessage,
};

use crate::config::ServerConfig;
use crate::gamelog::GameLogWriter;
use crate::registry::{ClientHandle, ClientRegistry, Handshake};

/// Everything that can reach the session task.
#[derive(Debug)]
pub enum SessionEvent {
    /// A socket finished its URL handshake.
    Connected {
        handshake: Handshake,
        handle: ClientHandle,
    },
    /// A socket dropped.
    Disconnected { conn_id: u64 },
    /// A decoded frame from a connected client.
    Inbound {
        conn_id: u64,
        message: ClientMessage,
    },
    /// Graceful stop; ends the session from any state.
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionSetupError {
    #[error("bad arena template: {0}")]
    Arena(#[from] ArenaError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One game from ready-gate to `END_GAME`.
pub struct GameSession {
    config: ServerConfig,
    arena: Arena,
    registry: ClientRegistry,
    events: mpsc::Receiver<SessionEvent>,
    /// The current turn's submission buffer. An entry is written at most
    /// once per turn; later submissions for the same seat are discarded.
    submissions: HashMap<PlayerId, Vec<Action>>,
}

impl GameSession {
    /// Parse and validate the configured arena up front so a broken
    /// template is a startup failure, not a mid-lobby surprise.
    pub fn new(
        config: ServerConfig,
        events: mpsc::Receiver<SessionEvent>,
    ) -> Result<Self, SessionSetupError> {
        let arena = arena::parse(&config.arena)?;
        GameEngine::new(
            arena.map.clone(),
            arena.units.clone(),
            EngineConfig::default(),
        )?;

        Ok(Self {
            registry: ClientRegistry::new(config.protocol_version),
            config,
            arena,
            events,
            submissions: HashMap::new(),
        })
    }

    /// Drive the session to termination.
    pub async fn run(mut self) {
        info!("session waiting for players");
        if !self.wait_for_players().await {
            info!("session stopped before start");
            return;
        }
        self.registry.mark_started();

        let start_at = now_ms();
        let mut engine = match GameEngine::new(
            self.arena.map.clone(),
            self.arena.units.clone(),
            EngineConfig {
                food_scarcity: self.config.food_scarcity,
                end_rules: EndRules {
                    max_turns: self.config.max_turns,
                    turn_limit_winner: None,
                },
                seed: self.config.seed,
                start_at,
            },
        ) {
            Ok(engine) => engine,
            Err(err) => {
                error!(error = %err, "engine setup failed");
                return;
            }
        };

        self.start_game(&engine);
        let outcome = self.play(&mut engine).await;
        self.finish(&engine, outcome);
    }

    /// WAITING_FOR_PLAYERS: admit, reject, and re-open seats until two
    /// compatible clients are attached. False means stop the session.
    async fn wait_for_players(&mut self) -> bool {
        while !self.registry.ready() {
            let Some(event) = self.events.recv().await else {
                return false;
            };
            match event {
                SessionEvent::Connected { handshake, handle } => self.admit(handshake, handle),
                SessionEvent::Disconnected { conn_id } => {
                    if let Some(player) = self.registry.remove_by_conn(conn_id) {
                        info!(player = %player, "player left before start; seat re-opened");
                    }
                }
                SessionEvent::Inbound { conn_id, .. } => {
                    warn!(conn_id, "message before session start; ignored");
                }
                SessionEvent::Shutdown => return false,
            }
        }
        true
    }

    fn admit(&mut self, handshake: Handshake, handle: ClientHandle) {
        let callsign = handshake.callsign.clone();
        match self.registry.register(handshake, handle.clone()) {
            Ok(player) => {
                info!(player = %player, callsign = %callsign, "client joined");
            }
            Err(err) => {
                warn!(callsign = %callsign, error = %err, "connection refused");
                handle.push(ServerMessage::InvalidOperation {
                    player_id: None,
                    reason: err.to_string(),
                });
                // Dropping the handle closes the socket.
            }
        }
    }

    /// STARTING: seat announcements, then the shared opening snapshot.
    /// Both clients have `START_GAME` queued before any `NEXT_TURN`.
    fn start_game(&mut self, engine: &GameEngine) {
        for player in PlayerId::PAIR {
            self.registry.send(
                player,
                ServerMessage::PlayerAssigned { player_id: player },
            );
        }
        let snapshot = engine.snapshot();
        self.registry.broadcast(ServerMessage::StartGame {
            game_start: GameStart {
                map: engine.map().snapshot(),
                initial_units: snapshot.units,
                timestamp: snapshot.start_at,
            },
        });
        info!(
            player1 = self.registry.callsign(PlayerId::ONE).unwrap_or("?"),
            player2 = self.registry.callsign(PlayerId::TWO).unwrap_or("?"),
            "game started"
        );
    }

    /// The AWAITING_ACTIONS / APPLYING loop. `None` means the session
    /// stopped without a verdict (shutdown, abandonment, fatal error).
    async fn play(&mut self, engine: &mut GameEngine) -> Option<GameOutcome> {
        loop {
            let turn_id = engine.turn_id();
            self.open_turn(engine, turn_id);
            let deadline = Instant::now() + self.config.turn_time_limit;

            if !self.collect_actions(turn_id, deadline).await {
                return None;
            }
            if self.registry.connected_count() == 0 {
                warn!("both players gone; abandoning session");
                return None;
            }

            let mut orders = TurnOrders::default();
            for player in PlayerId::PAIR {
                let actions = self.submissions.remove(&player).unwrap_or_default();
                let verdicts = validate_actions(engine.state(), player, &actions);
                if let Some(reason) = verdicts.first_rejection() {
                    warn!(player = %player, reason = %reason, "dropping invalid actions");
                    self.registry.send(
                        player,
                        ServerMessage::InvalidOperation {
                            player_id: Some(player),
                            reason: reason.to_string(),
                        },
                    );
                }
                orders.set(player, verdicts.moves);
            }

            match engine.advance_turn(&orders, now_ms()) {
                Ok(report) => {
                    if let Some(outcome) = report.outcome {
                        info!(turn = report.turn_id, winner = ?outcome.winner, "game over");
                        return Some(outcome);
                    }
                }
                Err(err) => {
                    error!(error = %err, "turn application failed; terminating session");
                    return None;
                }
            }
        }
    }

    /// Open a new turn: clear the buffer and emit `NEXT_TURN` per seat.
    fn open_turn(&mut self, engine: &GameEngine, turn_id: u32) {
        self.submissions.clear();
        let snapshot = engine.snapshot();
        let time_limit_ms = self.config.turn_time_limit_ms();
        for player in PlayerId::PAIR {
            self.registry.send(
                player,
                ServerMessage::NextTurn {
                    player_id: player,
                    turn_id,
                    game_state: snapshot.clone(),
                    time_limit_ms,
                },
            );
        }
    }

    /// Drain events until every connected player has submitted for
    /// `turn_id` or the deadline passes. False means stop the session.
    async fn collect_actions(&mut self, turn_id: u32, deadline: Instant) -> bool {
        loop {
            let all_in = PlayerId::PAIR
                .into_iter()
                .all(|p| !self.registry.is_connected(p) || self.submissions.contains_key(&p));
            if all_in {
                return true;
            }

            match timeout_at(deadline, self.events.recv()).await {
                Err(_) => {
                    debug!(turn = turn_id, "deadline reached; proceeding with partial submissions");
                    return true;
                }
                Ok(None) => return false,
                Ok(Some(event)) => {
                    if !self.handle_mid_game_event(turn_id, event) {
                        return false;
                    }
                }
            }
        }
    }

    fn handle_mid_game_event(&mut self, turn_id: u32, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Connected { handshake, handle } => {
                warn!(callsign = %handshake.callsign, "connection refused: session in progress");
                handle.push(ServerMessage::InvalidOperation {
                    player_id: None,
                    reason: "session already in progress".into(),
                });
            }
            SessionEvent::Disconnected { conn_id } => {
                if let Some(player) = self.registry.mark_disconnected(conn_id) {
                    warn!(player = %player, "player disconnected; empty turns from now on");
                }
            }
            SessionEvent::Inbound { conn_id, message } => {
                self.handle_submission(conn_id, turn_id, message);
            }
            SessionEvent::Shutdown => {
                info!("shutdown requested");
                return false;
            }
        }
        true
    }

    fn handle_submission(&mut self, conn_id: u64, current_turn: u32, message: ClientMessage) {
        let Some(player) = self.registry.player_by_conn(conn_id) else {
            warn!(conn_id, "message from unknown connection; ignored");
            return;
        };
        let ClientMessage::Action {
            player_id,
            turn_id,
            actions,
        } = message;

        if player_id != player {
            warn!(claimed = %player_id, bound = %player, "submission under the wrong identity; discarded");
            return;
        }
        if turn_id != current_turn {
            warn!(player = %player, turn_id, current_turn, "stale turn submission discarded");
            return;
        }
        if self.submissions.contains_key(&player) {
            warn!(player = %player, turn_id, "duplicate submission discarded");
            return;
        }
        self.submissions.insert(player, actions);
    }

    /// ENDING → TERMINATED: `END_GAME` is the last message each client
    /// sees, then the log is persisted and the handles drop.
    fn finish(&mut self, engine: &GameEngine, outcome: Option<GameOutcome>) {
        let winner = outcome.and_then(|o| o.winner);
        let now = now_ms();
        let map = engine.map().snapshot();
        let deltas = engine.history().to_vec();

        self.registry.broadcast(ServerMessage::EndGame {
            game_end: GameEnd {
                map: map.clone(),
                deltas: deltas.clone(),
                winner_id: winner,
                timestamp: now,
            },
        });

        let log = GameLog {
            players: self
                .registry
                .bindings()
                .map(|b| LogPlayer {
                    id: b.player_id,
                    callsign: b.callsign.clone(),
                })
                .collect(),
            map_dimensions: map.dimensions(),
            walls: map.walls,
            winner,
            timestamp: now,
            turns: deltas,
        };
        match GameLogWriter::new(&self.config.log_dir).write(&log) {
            Ok(path) => info!(path = %path.display(), "game log written"),
            Err(err) => warn!(error = %err, "game log not written"),
        }
        info!(winner = ?winner, "session terminated");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
