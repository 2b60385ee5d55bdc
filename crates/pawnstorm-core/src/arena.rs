//! ASCII arena templates.
//!
//! An arena is a rectangular character grid describing the initial board:
//!
//! ```text
//! 1a.......
//! ...#.#...
//! ....*....
//! ...#.#...
//! .......b2
//! ```
//!
//! `#` wall, `.` floor, `1`/`2` bases, `a`/`b` pawns, `*` food. Unit ids
//! are assigned in reading order starting at 1. The engine does not care
//! where its initial state came from; this parser is one producer of it.

use pawnstorm_protocol::{PlayerId, Position, Unit, UnitId};

use crate::GameMap;

/// A parsed template: the map plus the initial units standing on it.
#[derive(Clone, Debug)]
pub struct Arena {
    pub map: GameMap,
    pub units: Vec<Unit>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("arena template is empty")]
    Empty,
    #[error("row {row} is {got} tiles wide, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("unknown tile `{ch}` at {pos}")]
    UnknownTile { ch: char, pos: Position },
    #[error("{player} has {count} bases, expected exactly one")]
    BadBaseCount { player: PlayerId, count: usize },
}

/// The default two-player arena used when no template is configured.
pub const SKIRMISH: &str = "\
1a.......
.........
...#.#...
..#...#..
....*....
..#...#..
...#.#...
.........
.......b2";

/// Parse a template into a map and its initial units.
pub fn parse(template: &str) -> Result<Arena, ArenaError> {
    let rows: Vec<&str> = template
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    let Some(first) = rows.first() else {
        return Err(ArenaError::Empty);
    };

    let width = first.chars().count();
    let mut walls = Vec::new();
    let mut units: Vec<Unit> = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        let got = row.chars().count();
        if got != width {
            return Err(ArenaError::RaggedRow {
                row: y,
                got,
                expected: width,
            });
        }
        for (x, ch) in row.chars().enumerate() {
            let pos = Position::new(x as i32, y as i32);
            // Reading order doubles as id order.
            let id = UnitId(units.len() as u32 + 1);
            match ch {
                '.' => {}
                '#' => walls.push(pos),
                '1' => units.push(Unit::base(id, PlayerId::ONE, pos)),
                '2' => units.push(Unit::base(id, PlayerId::TWO, pos)),
                'a' => units.push(Unit::pawn(id, PlayerId::ONE, pos)),
                'b' => units.push(Unit::pawn(id, PlayerId::TWO, pos)),
                '*' => units.push(Unit::food(id, pos)),
                _ => return Err(ArenaError::UnknownTile { ch, pos }),
            }
        }
    }

    for player in PlayerId::PAIR {
        let count = units
            .iter()
            .filter(|u| u.is_base() && u.owner == Some(player))
            .count();
        if count != 1 {
            return Err(ArenaError::BadBaseCount { player, count });
        }
    }

    Ok(Arena {
        map: GameMap::new(width as u32, rows.len() as u32, walls),
        units,
    })
}
