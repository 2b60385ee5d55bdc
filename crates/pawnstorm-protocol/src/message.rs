//! Session wire messages, discriminated by a `type` tag.
//!
//! The reference encoding is UTF-8 JSON with SCREAMING_SNAKE_CASE
//! discriminators and camelCase payload fields; see [`crate::wire`].

use serde::{Deserialize, Serialize};

use crate::{GameDelta, MapSnapshot, PlayerId, StateSnapshot, Unit, UnitId};

/// A single movement order for one pawn.
///
/// The direction travels as the raw wire string so that a typo is rejected
/// per-action by the validator instead of poisoning the whole submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub unit_id: UnitId,
    #[serde(default)]
    pub direction: Option<String>,
}

impl Action {
    pub fn new(unit_id: UnitId, direction: impl Into<String>) -> Self {
        Self {
            unit_id,
            direction: Some(direction.into()),
        }
    }
}

/// Client-to-server messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Submit this turn's movement orders. At most one submission per
    /// player per `turn_id` is honored; the rest are discarded.
    Action {
        player_id: PlayerId,
        turn_id: u32,
        actions: Vec<Action>,
    },
}

/// Server-to-client messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// The seat this connection was bound to. First message after connect.
    PlayerAssigned { player_id: PlayerId },
    /// Session start: map plus initial units. Both clients receive this
    /// before either receives turn 0's `NEXT_TURN`.
    StartGame { game_start: GameStart },
    /// A new turn is open for submissions until the deadline.
    NextTurn {
        player_id: PlayerId,
        turn_id: u32,
        game_state: StateSnapshot,
        time_limit_ms: u64,
    },
    /// An action (or handshake) was rejected. The turn still proceeds.
    InvalidOperation {
        /// Omitted for connections rejected before a seat was assigned.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
        reason: String,
    },
    /// Final message of a session.
    EndGame { game_end: GameEnd },
}

/// Payload of `START_GAME`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStart {
    pub map: MapSnapshot,
    pub initial_units: Vec<Unit>,
    /// Epoch milliseconds.
    pub timestamp: u64,
}

/// Payload of `END_GAME`: the full delta history for offline replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    pub map: MapSnapshot,
    pub deltas: Vec<GameDelta>,
    pub winner_id: Option<PlayerId>,
    /// Epoch milliseconds.
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn action_message_wire_shape() {
        let msg = ClientMessage::Action {
            player_id: PlayerId::ONE,
            turn_id: 3,
            actions: vec![Action::new(UnitId(10), "NE")],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "ACTION",
                "playerId": "player1",
                "turnId": 3,
                "actions": [{"unitId": 10, "direction": "NE"}],
            })
        );
    }

    #[test]
    fn action_direction_may_be_absent() {
        let raw = r#"{"type":"ACTION","playerId":"player2","turnId":0,"actions":[{"unitId":4}]}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        let ClientMessage::Action { actions, .. } = msg;
        assert_eq!(actions[0].direction, None);
    }

    #[test]
    fn server_message_discriminators() {
        let assigned = ServerMessage::PlayerAssigned {
            player_id: PlayerId::TWO,
        };
        let json = serde_json::to_value(&assigned).unwrap();
        assert_eq!(json["type"], "PLAYER_ASSIGNED");
        assert_eq!(json["playerId"], "player2");

        let invalid = ServerMessage::InvalidOperation {
            player_id: None,
            reason: "incompatible protocol version".into(),
        };
        let json = serde_json::to_value(&invalid).unwrap();
        assert_eq!(json["type"], "INVALID_OPERATION");
        assert!(json.get("playerId").is_none());
    }

    #[test]
    fn end_game_roundtrip() {
        let msg = ServerMessage::EndGame {
            game_end: GameEnd {
                map: MapSnapshot {
                    width: 5,
                    height: 5,
                    walls: vec![Position::new(2, 2)],
                },
                deltas: vec![GameDelta {
                    added_or_modified: vec![],
                    removed: vec![UnitId(10)],
                    timestamp: 1,
                }],
                winner_id: Some(PlayerId::ONE),
                timestamp: 2,
            },
        };
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: ServerMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }
}
