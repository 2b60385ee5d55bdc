//! The food economy's supply side: one seeded Bernoulli roll per turn.

use pawnstorm_protocol::{Position, Unit};

use crate::{GameMap, GameRng, GameState, UnitIdAllocator};

/// Roll the per-turn food drop and, on success, place one `Food` unit on
/// a tile chosen uniformly from the open, unoccupied tiles.
///
/// Exactly one Bernoulli draw happens per call whatever the outcome, so
/// the generator stream stays aligned across replays.
pub fn roll_food_spawn(
    state: &mut GameState,
    map: &GameMap,
    scarcity: f32,
    rng: &mut GameRng,
    ids: &mut UnitIdAllocator,
) -> Option<Unit> {
    if !rng.chance(scarcity) {
        return None;
    }

    let open: Vec<Position> = map
        .tiles()
        .filter(|&tile| !map.is_wall(tile) && !state.is_occupied(tile))
        .collect();
    if open.is_empty() {
        return None;
    }

    let tile = open[rng.pick_index(open.len())];
    let food = Unit::food(ids.allocate(), tile);
    state.units.insert(food.id, food.clone());
    Some(food)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawnstorm_protocol::{PlayerId, UnitId};

    fn setup() -> (GameState, GameMap, UnitIdAllocator) {
        let state = GameState::new(
            [
                Unit::base(UnitId(1), PlayerId::ONE, Position::new(0, 0)),
                Unit::base(UnitId(2), PlayerId::TWO, Position::new(2, 2)),
            ],
            0,
        );
        let map = GameMap::new(3, 3, [Position::new(1, 1)]);
        (state, map, UnitIdAllocator::starting_at(UnitId(100)))
    }

    #[test]
    fn zero_scarcity_never_spawns() {
        let (mut state, map, mut ids) = setup();
        let mut rng = GameRng::seed_from_u64(42);
        for _ in 0..50 {
            assert!(roll_food_spawn(&mut state, &map, 0.0, &mut rng, &mut ids).is_none());
        }
        assert_eq!(state.units.len(), 2);
    }

    #[test]
    fn certain_scarcity_spawns_on_an_open_tile() {
        let (mut state, map, mut ids) = setup();
        let mut rng = GameRng::seed_from_u64(42);

        let food = roll_food_spawn(&mut state, &map, 1.0, &mut rng, &mut ids).unwrap();
        assert!(food.is_food());
        assert!(map.is_open(food.pos));
        assert_ne!(food.pos, Position::new(0, 0));
        assert_ne!(food.pos, Position::new(2, 2));
        assert_ne!(food.pos, Position::new(1, 1));
        assert_eq!(state.units.len(), 3);
    }

    #[test]
    fn full_board_spawns_nothing() {
        let (mut state, map, mut ids) = setup();
        let mut rng = GameRng::seed_from_u64(42);
        for tile in map.tiles() {
            if map.is_open(tile) && !state.is_occupied(tile) {
                let filler = Unit::food(ids.allocate(), tile);
                state.units.insert(filler.id, filler);
            }
        }
        assert!(roll_food_spawn(&mut state, &map, 1.0, &mut rng, &mut ids).is_none());
    }

    #[test]
    fn placement_is_seed_deterministic() {
        let run = |seed: u64| {
            let (mut state, map, mut ids) = setup();
            let mut rng = GameRng::seed_from_u64(seed);
            (0..10)
                .filter_map(|_| roll_food_spawn(&mut state, &map, 0.5, &mut rng, &mut ids))
                .map(|food| food.pos)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }
}
