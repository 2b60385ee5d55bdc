use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Major protocol version. Clients advertise the major they expect at
/// handshake; a mismatch is rejected before a seat is assigned.
pub const PROTOCOL_VERSION: u32 = 1;

/// Player identity: a seat index with the canonical wire names
/// `player1` / `player2`, assigned in arrival order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub const ONE: PlayerId = PlayerId(0);
    pub const TWO: PlayerId = PlayerId(1);

    /// Both seats of a session, in assignment order.
    pub const PAIR: [PlayerId; 2] = [PlayerId::ONE, PlayerId::TWO];

    #[inline]
    pub fn opponent(self) -> PlayerId {
        if self == Self::ONE {
            Self::TWO
        } else {
            Self::ONE
        }
    }

    pub fn as_str(self) -> &'static str {
        if self == Self::ONE {
            "player1"
        } else {
            "player2"
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PlayerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "player1" => Ok(PlayerId::ONE),
            "player2" => Ok(PlayerId::TWO),
            other => Err(de::Error::unknown_variant(other, &["player1", "player2"])),
        }
    }
}

/// Unit ids are session-scoped and strictly monotonic; an id is never
/// reused, even after the unit is destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
