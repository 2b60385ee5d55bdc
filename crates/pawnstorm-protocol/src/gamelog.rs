use serde::{Deserialize, Serialize};

use crate::{Dimensions, GameDelta, PlayerId, Position};

/// End-of-game document consumed by the replay viewer. Persisted as a
/// single JSON file named `game_<epochMs>.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLog {
    pub players: Vec<LogPlayer>,
    pub map_dimensions: Dimensions,
    pub walls: Vec<Position>,
    pub winner: Option<PlayerId>,
    /// Epoch milliseconds at which the game ended.
    pub timestamp: u64,
    pub turns: Vec<GameDelta>,
}

/// Roster entry: seat identity plus the callsign the client chose at
/// handshake (logging only, never authoritative).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPlayer {
    pub id: PlayerId,
    pub callsign: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_log_roundtrip() {
        let log = GameLog {
            players: vec![
                LogPlayer {
                    id: PlayerId::ONE,
                    callsign: "ada".into(),
                },
                LogPlayer {
                    id: PlayerId::TWO,
                    callsign: "grace".into(),
                },
            ],
            map_dimensions: Dimensions {
                width: 5,
                height: 5,
            },
            walls: vec![],
            winner: None,
            timestamp: 1_700_000_000_000,
            turns: vec![],
        };
        let json = serde_json::to_string(&log).unwrap();
        let back: GameLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
        assert!(json.contains("mapDimensions"));
    }
}
