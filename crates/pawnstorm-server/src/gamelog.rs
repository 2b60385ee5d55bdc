//! End-of-game persistence for the replay viewer.

use std::fs;
use std::path::{Path, PathBuf};

use pawnstorm_protocol::{wire, GameLog};

#[derive(Debug, thiserror::Error)]
pub enum GameLogError {
    #[error("could not encode game log: {0}")]
    Encode(#[from] wire::WireError),
    #[error("could not write game log: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes one `game_<epochMs>.json` document per finished session.
#[derive(Clone, Debug)]
pub struct GameLogWriter {
    dir: PathBuf,
}

impl GameLogWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Persist the log, creating the directory if needed. Returns the
    /// path written.
    pub fn write(&self, log: &GameLog) -> Result<PathBuf, GameLogError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("game_{}.json", log.timestamp));
        fs::write(&path, wire::encode_game_log(log)?)?;
        Ok(path)
    }
}
