use std::collections::HashSet;

use pawnstorm_protocol::{MapSnapshot, Position};

/// The immutable board layout for a session: rectangular bounds plus a
/// set of wall tiles. Walls are never legal move targets and never hold
/// units.
#[derive(Clone, Debug)]
pub struct GameMap {
    width: u32,
    height: u32,
    walls: HashSet<Position>,
}

impl GameMap {
    pub fn new(width: u32, height: u32, walls: impl IntoIterator<Item = Position>) -> Self {
        Self {
            width,
            height,
            walls: walls.into_iter().collect(),
        }
    }

    /// A wall-free board, the common shape in tests.
    pub fn open_field(width: u32, height: u32) -> Self {
        Self::new(width, height, [])
    }

    pub fn from_snapshot(snapshot: &MapSnapshot) -> Self {
        Self::new(
            snapshot.width,
            snapshot.height,
            snapshot.walls.iter().copied(),
        )
    }

    /// Wire form; walls in row-major order for a stable encoding.
    pub fn snapshot(&self) -> MapSnapshot {
        let mut walls: Vec<Position> = self.walls.iter().copied().collect();
        walls.sort_by_key(|pos| (pos.y, pos.x));
        MapSnapshot {
            width: self.width,
            height: self.height,
            walls,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    #[inline]
    pub fn is_wall(&self, pos: Position) -> bool {
        self.walls.contains(&pos)
    }

    /// On-map and not a wall; the only tiles units may occupy.
    #[inline]
    pub fn is_open(&self, pos: Position) -> bool {
        self.in_bounds(pos) && !self.is_wall(pos)
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.width as i32;
        let height = self.height as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }
}
