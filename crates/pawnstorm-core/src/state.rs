use std::collections::BTreeMap;

use pawnstorm_protocol::{GameDelta, PlayerId, Position, StateSnapshot, Unit, UnitId};

/// The authoritative game state. Units are keyed by id in a `BTreeMap` so
/// every iteration, and therefore every order-sensitive rule, runs in
/// ascending-id order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub units: BTreeMap<UnitId, Unit>,
    /// Session start, epoch milliseconds.
    pub start_at: u64,
}

impl GameState {
    pub fn new(units: impl IntoIterator<Item = Unit>, start_at: u64) -> Self {
        Self {
            units: units.into_iter().map(|u| (u.id, u)).collect(),
            start_at,
        }
    }

    pub fn from_snapshot(snapshot: &StateSnapshot) -> Self {
        Self::new(snapshot.units.iter().cloned(), snapshot.start_at)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            units: self.units.values().cloned().collect(),
            start_at: self.start_at,
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units
            .values()
            .filter(move |u| u.owner == Some(player))
    }

    /// The player's base, if it still stands.
    pub fn base_of(&self, player: PlayerId) -> Option<&Unit> {
        self.units_of(player).find(|u| u.is_base())
    }

    pub fn pawn_count(&self, player: PlayerId) -> usize {
        self.units_of(player).filter(|u| u.is_pawn()).count()
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.units.values().any(|u| u.pos == pos)
    }
}

/// Apply one delta in place: upsert changed units, then drop removals.
pub fn apply_delta(units: &mut BTreeMap<UnitId, Unit>, delta: &GameDelta) {
    for unit in &delta.added_or_modified {
        units.insert(unit.id, unit.clone());
    }
    for id in &delta.removed {
        units.remove(id);
    }
}

/// Replay a delta history over an initial snapshot. The result must equal
/// the live state at the same turn; the engine tests hold it to that.
pub fn replay(initial: &StateSnapshot, deltas: &[GameDelta]) -> BTreeMap<UnitId, Unit> {
    let mut units: BTreeMap<UnitId, Unit> =
        initial.units.iter().map(|u| (u.id, u.clone())).collect();
    for delta in deltas {
        apply_delta(&mut units, delta);
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawnstorm_protocol::UnitKind;

    fn sample_state() -> GameState {
        GameState::new(
            [
                Unit::base(UnitId(1), PlayerId::ONE, Position::new(0, 0)),
                Unit::base(UnitId(2), PlayerId::TWO, Position::new(4, 4)),
                Unit::pawn(UnitId(10), PlayerId::ONE, Position::new(2, 2)),
                Unit::food(UnitId(99), Position::new(3, 2)),
            ],
            1000,
        )
    }

    #[test]
    fn queries() {
        let state = sample_state();
        assert_eq!(state.base_of(PlayerId::ONE).map(|u| u.id), Some(UnitId(1)));
        assert_eq!(state.pawn_count(PlayerId::ONE), 1);
        assert_eq!(state.pawn_count(PlayerId::TWO), 0);
        assert!(state.is_occupied(Position::new(3, 2)));
        assert!(!state.is_occupied(Position::new(1, 1)));
        assert_eq!(state.unit(UnitId(99)).map(|u| u.kind), Some(UnitKind::Food));
    }

    #[test]
    fn snapshot_roundtrip() {
        let state = sample_state();
        let snap = state.snapshot();
        assert_eq!(GameState::from_snapshot(&snap), state);
    }

    #[test]
    fn replay_applies_in_order() {
        let state = sample_state();
        let moved = Unit::pawn(UnitId(10), PlayerId::ONE, Position::new(3, 2));
        let deltas = vec![
            GameDelta {
                added_or_modified: vec![moved.clone()],
                removed: vec![UnitId(99)],
                timestamp: 1,
            },
            GameDelta {
                added_or_modified: vec![Unit::pawn(UnitId(100), PlayerId::ONE, Position::new(0, 0))],
                removed: vec![],
                timestamp: 2,
            },
        ];

        let units = replay(&state.snapshot(), &deltas);
        assert_eq!(units.get(&UnitId(10)), Some(&moved));
        assert!(!units.contains_key(&UnitId(99)));
        assert!(units.contains_key(&UnitId(100)));
    }
}
