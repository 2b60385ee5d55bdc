use serde::{Deserialize, Serialize};

use crate::{PlayerId, Position, UnitId};

/// What a unit is. Bases and food never move; only pawns take orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitKind {
    Base,
    Pawn,
    Food,
}

/// One unit on the board. Identity and cross-turn equality are by `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    /// `None` iff `kind` is `Food`.
    pub owner: Option<PlayerId>,
    pub kind: UnitKind,
    pub pos: Position,
}

impl Unit {
    pub fn base(id: UnitId, owner: PlayerId, pos: Position) -> Self {
        Self {
            id,
            owner: Some(owner),
            kind: UnitKind::Base,
            pos,
        }
    }

    pub fn pawn(id: UnitId, owner: PlayerId, pos: Position) -> Self {
        Self {
            id,
            owner: Some(owner),
            kind: UnitKind::Pawn,
            pos,
        }
    }

    pub fn food(id: UnitId, pos: Position) -> Self {
        Self {
            id,
            owner: None,
            kind: UnitKind::Food,
            pos,
        }
    }

    #[inline]
    pub fn is_pawn(&self) -> bool {
        self.kind == UnitKind::Pawn
    }

    #[inline]
    pub fn is_base(&self) -> bool {
        self.kind == UnitKind::Base
    }

    #[inline]
    pub fn is_food(&self) -> bool {
        self.kind == UnitKind::Food
    }
}

/// Wire form of the authoritative state: the full unit list plus the
/// session start timestamp (epoch milliseconds).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub units: Vec<Unit>,
    pub start_at: u64,
}

/// Minimal change between two consecutive states: units that appeared or
/// moved, and ids of units that were destroyed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDelta {
    pub added_or_modified: Vec<Unit>,
    pub removed: Vec<UnitId>,
    /// Epoch milliseconds at which the turn was applied.
    pub timestamp: u64,
}

impl GameDelta {
    pub fn is_empty(&self) -> bool {
        self.added_or_modified.is_empty() && self.removed.is_empty()
    }
}
