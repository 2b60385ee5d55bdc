use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tile coordinates. `x` grows east, `y` grows south; `(0, 0)` is the
/// north-west corner of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile one step away in `dir`. May be off-map; callers validate
    /// against the layout.
    #[inline]
    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.offset();
        Position::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The eight compass directions a pawn can be ordered to move in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// Unit offset `(dx, dy)` of this direction.
    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
            Direction::E => (1, 0),
            Direction::SE => (1, 1),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, -1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NE => "NE",
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spelling the protocol does not recognize as a direction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction `{0}`")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|dir| dir.as_str() == raw)
            .ok_or_else(|| UnknownDirection(raw.to_string()))
    }
}

/// Wire form of the immutable map layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    pub width: u32,
    pub height: u32,
    pub walls: Vec<Position>,
}

impl MapSnapshot {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// Width/height pair as persisted in the game log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_unit_steps() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.offset();
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
            assert!((dx, dy) != (0, 0));
        }
    }

    #[test]
    fn opposite_steps_cancel() {
        let start = Position::new(3, 3);
        assert_eq!(start.step(Direction::NE).step(Direction::SW), start);
        assert_eq!(start.step(Direction::N).step(Direction::S), start);
    }

    #[test]
    fn direction_parses_wire_spelling() {
        assert_eq!("NW".parse::<Direction>().unwrap(), Direction::NW);
        assert_eq!(
            "north".parse::<Direction>(),
            Err(UnknownDirection("north".into()))
        );
    }
}
