//! Pawnstorm authoritative game server.
//!
//! One session per process: two clients connect over WebSocket, the turn
//! coordinator drives the pure rules engine from `pawnstorm-core`, and
//! the finished game is persisted for the replay viewer.

pub mod config;
pub mod gamelog;
pub mod registry;
pub mod session;
pub mod transport;

pub use config::ServerConfig;
pub use gamelog::{GameLogError, GameLogWriter};
pub use registry::{ClientHandle, ClientRegistry, Handshake, JoinError, PlayerBinding};
pub use session::{GameSession, SessionEvent, SessionSetupError};
pub use transport::TransportError;
