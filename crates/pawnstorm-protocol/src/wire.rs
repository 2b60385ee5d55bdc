//! The single codec boundary for the session protocol.
//!
//! The core never sees bytes; transports call these helpers to move
//! between UTF-8 JSON frames and typed messages.

use thiserror::Error;

use crate::{ClientMessage, GameLog, ServerMessage};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode_client_message(msg: &ClientMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(msg)?)
}

pub fn decode_client_message(raw: &str) -> Result<ClientMessage, WireError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_server_message(msg: &ServerMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(msg)?)
}

pub fn decode_server_message(raw: &str) -> Result<ServerMessage, WireError> {
    Ok(serde_json::from_str(raw)?)
}

/// Game logs are written pretty-printed; the replay viewer and humans
/// both read them.
pub fn encode_game_log(log: &GameLog) -> Result<String, WireError> {
    Ok(serde_json::to_string_pretty(log)?)
}

pub fn decode_game_log(raw: &str) -> Result<GameLog, WireError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, PlayerId, UnitId};

    #[test]
    fn client_message_roundtrip() {
        let msg = ClientMessage::Action {
            player_id: PlayerId::ONE,
            turn_id: 12,
            actions: vec![Action::new(UnitId(3), "S")],
        };
        let encoded = encode_client_message(&msg).unwrap();
        let decoded = decode_client_message(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(decode_client_message("{\"type\":\"ACTION\"").is_err());
        assert!(decode_client_message("{\"type\":\"DANCE\"}").is_err());
    }
}
