//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pawnstorm_core::arena;
use pawnstorm_protocol::PROTOCOL_VERSION;

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the WebSocket listener
    pub bind_address: SocketAddr,
    /// Per-turn submission deadline
    pub turn_time_limit: Duration,
    /// Per-turn food drop probability, in [0, 1]
    pub food_scarcity: f32,
    /// Optional hard stop; reaching it is a draw
    pub max_turns: Option<u32>,
    /// RNG seed; the session start timestamp when absent
    pub seed: Option<u64>,
    /// Protocol major advertised to clients
    pub protocol_version: u32,
    /// Directory the end-of-game log is written into
    pub log_dir: PathBuf,
    /// Arena template the session is played on
    pub arena: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7777".parse().unwrap(),
            turn_time_limit: Duration::from_secs(10),
            food_scarcity: 0.1,
            max_turns: None,
            seed: None,
            protocol_version: PROTOCOL_VERSION,
            log_dir: PathBuf::from("game-logs"),
            arena: arena::SKIRMISH.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn turn_time_limit_ms(&self) -> u64 {
        self.turn_time_limit.as_millis() as u64
    }
}
