//! The state updater: simultaneous movement, collision resolution, and
//! spawn materialization.
//!
//! Both players' moves are resolved as if made at the same instant. The
//! updater runs four ordered phases (intent, swap cancellation, tile
//! resolution, spawn resolution) and each phase is computed from its
//! phase-input snapshot, never interleaved. Every order-sensitive choice
//! (annihilation pairing, food consumer) ties-break by ascending unit id.

use std::collections::{BTreeMap, BTreeSet};

use pawnstorm_protocol::{PlayerId, Position, Unit, UnitId, UnitKind};

use crate::{GameMap, GameState, Move, UnitIdAllocator};

/// Validated orders for one turn, one set per seat. A player that missed
/// the deadline simply has an empty set here.
#[derive(Clone, Debug, Default)]
pub struct TurnOrders {
    sets: [Vec<Move>; 2],
}

impl TurnOrders {
    pub fn set(&mut self, player: PlayerId, moves: Vec<Move>) {
        self.sets[player.0 as usize] = moves;
    }

    pub fn get(&self, player: PlayerId) -> &[Move] {
        &self.sets[player.0 as usize]
    }

    pub fn single(player: PlayerId, moves: Vec<Move>) -> Self {
        let mut orders = Self::default();
        orders.set(player, moves);
        orders
    }
}

/// What one turn of movement resolved to, before the food roll.
#[derive(Clone, Debug)]
pub struct TurnResolution {
    /// Surviving units at their post-turn positions, including pawns
    /// materialized in phase 4.
    pub units: BTreeMap<UnitId, Unit>,
    /// Players that destroyed the enemy base this turn. The end evaluator
    /// awards these before anything else.
    pub base_captures: Vec<PlayerId>,
    /// Pawn spawns earned from food this turn; they materialize at the
    /// start of the next turn.
    pub scheduled_spawns: Vec<PlayerId>,
    /// Pawns that materialized this turn from last turn's food.
    pub spawned: Vec<Unit>,
}

/// Resolve one turn of simultaneous movement.
///
/// `pending_spawns` are the spawns earned on the previous turn; the ones
/// earned now are returned in [`TurnResolution::scheduled_spawns`].
pub fn resolve_turn(
    state: &GameState,
    map: &GameMap,
    orders: &TurnOrders,
    pending_spawns: &[PlayerId],
    ids: &mut UnitIdAllocator,
) -> TurnResolution {
    // Phase 1: intent. Acting pawns aim one step out; off-map and wall
    // targets cancel. Everything else stays on its tile.
    let mut targets: BTreeMap<UnitId, Position> = state
        .units
        .iter()
        .map(|(id, unit)| (*id, unit.pos))
        .collect();
    for player in PlayerId::PAIR {
        for mv in orders.get(player) {
            let Some(unit) = state.unit(mv.unit) else {
                continue;
            };
            // Only the seat's own pawns move; bases and food never do.
            if !unit.is_pawn() || unit.owner != Some(player) {
                continue;
            }
            let dest = unit.pos.step(mv.dir);
            if map.is_open(dest) {
                targets.insert(mv.unit, dest);
            }
        }
    }

    // Phase 2: swap cancellation. Enemy pawns cannot pass through each
    // other; friendly pawns can. Pairs are detected against the phase-1
    // snapshot and cancelled together, so a cancelled pawn cannot
    // re-enable another swap.
    let mut movers: Vec<(UnitId, PlayerId, Position, Position)> = Vec::new();
    for (id, unit) in &state.units {
        if !unit.is_pawn() {
            continue;
        }
        let Some(owner) = unit.owner else { continue };
        let target = targets[id];
        if target != unit.pos {
            movers.push((*id, owner, unit.pos, target));
        }
    }
    let mut cancelled: BTreeSet<UnitId> = BTreeSet::new();
    for i in 0..movers.len() {
        let (a_id, a_owner, a_from, a_to) = movers[i];
        for &(b_id, b_owner, b_from, b_to) in &movers[i + 1..] {
            if a_owner != b_owner && a_to == b_from && b_to == a_from {
                cancelled.insert(a_id);
                cancelled.insert(b_id);
            }
        }
    }
    for id in &cancelled {
        if let Some(unit) = state.unit(*id) {
            targets.insert(*id, unit.pos);
        }
    }

    // Phase 3: tile resolution over the post-cancellation targets.
    let mut by_tile: BTreeMap<Position, Vec<UnitId>> = BTreeMap::new();
    for (id, target) in &targets {
        // Ascending-id order within each tile, since `targets` is keyed
        // by unit id.
        by_tile.entry(*target).or_default().push(*id);
    }

    let mut destroyed: BTreeSet<UnitId> = BTreeSet::new();
    let mut base_captures: Vec<PlayerId> = Vec::new();
    let mut scheduled_spawns: Vec<PlayerId> = Vec::new();

    for group in by_tile.values() {
        let mut base: Option<(UnitId, PlayerId)> = None;
        let mut food: Option<UnitId> = None;
        let mut pawns: [Vec<UnitId>; 2] = [Vec::new(), Vec::new()];
        for &id in group {
            let Some(unit) = state.unit(id) else { continue };
            match (unit.kind, unit.owner) {
                (UnitKind::Base, Some(owner)) => base = Some((id, owner)),
                (UnitKind::Pawn, Some(owner)) => pawns[owner.0 as usize].push(id),
                (UnitKind::Food, _) => food = Some(id),
                _ => {}
            }
        }

        if let Some((base_id, defender)) = base {
            let attacker = defender.opponent();
            if !pawns[attacker.0 as usize].is_empty() {
                // The base falls and every pawn on the tile falls with it.
                // No survivor remains, so food on the tile (if any) stays.
                destroyed.insert(base_id);
                destroyed.extend(pawns[0].iter().copied());
                destroyed.extend(pawns[1].iter().copied());
                base_captures.push(attacker);
                continue;
            }
        }

        let pair_count = pawns[0].len().min(pawns[1].len());
        if pair_count > 0 {
            // Mutual annihilation, paired off in ascending-id order. With
            // equal counts the tile ends empty.
            destroyed.extend(pawns[0].iter().take(pair_count).copied());
            destroyed.extend(pawns[1].iter().take(pair_count).copied());
        }

        if let Some(food_id) = food {
            // The lowest-id surviving pawn eats; its owner banks a spawn
            // for next turn. No survivor leaves the food in place.
            let eater = group.iter().copied().find(|id| {
                !destroyed.contains(id) && state.unit(*id).is_some_and(|u| u.is_pawn())
            });
            if let Some(owner) = eater.and_then(|id| state.unit(id)).and_then(|u| u.owner) {
                destroyed.insert(food_id);
                scheduled_spawns.push(owner);
            }
        }
    }

    // Survivors settle on their targets.
    let mut units: BTreeMap<UnitId, Unit> = BTreeMap::new();
    for (id, unit) in &state.units {
        if destroyed.contains(id) {
            continue;
        }
        let mut settled = unit.clone();
        settled.pos = targets[id];
        units.insert(*id, settled);
    }

    // Phase 4: spawn resolution. Last turn's earned spawns materialize
    // on the owner's base tile. A missing base or an enemy pawn standing
    // on it suppresses the spawn.
    let mut spawned: Vec<Unit> = Vec::new();
    for &owner in pending_spawns {
        let Some(base_pos) = units
            .values()
            .find(|u| u.is_base() && u.owner == Some(owner))
            .map(|u| u.pos)
        else {
            continue;
        };
        let enemy_on_base = units
            .values()
            .any(|u| u.is_pawn() && u.owner == Some(owner.opponent()) && u.pos == base_pos);
        if enemy_on_base {
            continue;
        }
        let pawn = Unit::pawn(ids.allocate(), owner, base_pos);
        spawned.push(pawn.clone());
        units.insert(pawn.id, pawn);
    }

    TurnResolution {
        units,
        base_captures,
        scheduled_spawns,
        spawned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawnstorm_protocol::Direction;

    const P1: PlayerId = PlayerId::ONE;
    const P2: PlayerId = PlayerId::TWO;

    fn pos(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn mv(unit: u32, dir: Direction) -> Move {
        Move {
            unit: UnitId(unit),
            dir,
        }
    }

    /// 5x5 open field with both bases in opposite corners.
    fn base_state(extra: impl IntoIterator<Item = Unit>) -> GameState {
        let mut units = vec![
            Unit::base(UnitId(1), P1, pos(0, 0)),
            Unit::base(UnitId(2), P2, pos(4, 4)),
        ];
        units.extend(extra);
        GameState::new(units, 0)
    }

    fn resolve(
        state: &GameState,
        orders: TurnOrders,
        pending: &[PlayerId],
    ) -> (TurnResolution, UnitIdAllocator) {
        let map = GameMap::open_field(5, 5);
        let mut ids = UnitIdAllocator::starting_at(UnitId(100));
        let resolution = resolve_turn(state, &map, &orders, pending, &mut ids);
        (resolution, ids)
    }

    #[test]
    fn head_on_swap_cancels_both() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::pawn(UnitId(11), P2, pos(3, 2)),
        ]);
        let mut orders = TurnOrders::default();
        orders.set(P1, vec![mv(10, Direction::E)]);
        orders.set(P2, vec![mv(11, Direction::W)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        assert_eq!(resolution.units[&UnitId(10)].pos, pos(2, 2));
        assert_eq!(resolution.units[&UnitId(11)].pos, pos(3, 2));
        assert_eq!(resolution.units.len(), 4);
    }

    #[test]
    fn friendly_swap_proceeds() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::pawn(UnitId(11), P1, pos(3, 2)),
        ]);
        let mut orders = TurnOrders::default();
        orders.set(P1, vec![mv(10, Direction::E), mv(11, Direction::W)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        assert_eq!(resolution.units[&UnitId(10)].pos, pos(3, 2));
        assert_eq!(resolution.units[&UnitId(11)].pos, pos(2, 2));
    }

    #[test]
    fn walking_into_a_standing_enemy_annihilates_both() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::pawn(UnitId(11), P2, pos(3, 2)),
        ]);
        let orders = TurnOrders::single(P1, vec![mv(10, Direction::E)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        assert!(!resolution.units.contains_key(&UnitId(10)));
        assert!(!resolution.units.contains_key(&UnitId(11)));
        assert!(resolution.base_captures.is_empty());
    }

    #[test]
    fn friendly_pawns_stack() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::pawn(UnitId(11), P1, pos(3, 3)),
        ]);
        let orders = TurnOrders::single(P1, vec![mv(10, Direction::E), mv(11, Direction::N)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        assert_eq!(resolution.units[&UnitId(10)].pos, pos(3, 2));
        assert_eq!(resolution.units[&UnitId(11)].pos, pos(3, 2));
    }

    #[test]
    fn off_map_and_wall_intents_cancel() {
        let map = GameMap::new(5, 5, [pos(3, 2)]);
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::pawn(UnitId(11), P1, pos(0, 2)),
        ]);
        let orders = TurnOrders::single(P1, vec![mv(10, Direction::E), mv(11, Direction::W)]);
        let mut ids = UnitIdAllocator::starting_at(UnitId(100));

        let resolution = resolve_turn(&state, &map, &orders, &[], &mut ids);
        assert_eq!(resolution.units[&UnitId(10)].pos, pos(2, 2));
        assert_eq!(resolution.units[&UnitId(11)].pos, pos(0, 2));
    }

    #[test]
    fn food_is_eaten_and_spawn_scheduled() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::food(UnitId(99), pos(3, 2)),
        ]);
        let orders = TurnOrders::single(P1, vec![mv(10, Direction::E)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        assert_eq!(resolution.units[&UnitId(10)].pos, pos(3, 2));
        assert!(!resolution.units.contains_key(&UnitId(99)));
        assert_eq!(resolution.scheduled_spawns, vec![P1]);
        assert!(resolution.spawned.is_empty());
    }

    #[test]
    fn earned_spawn_materializes_next_turn_at_base() {
        let state = base_state([Unit::pawn(UnitId(10), P1, pos(3, 2))]);
        let (resolution, _) = resolve(&state, TurnOrders::default(), &[P1]);

        assert_eq!(resolution.spawned.len(), 1);
        let pawn = &resolution.spawned[0];
        assert_eq!(pawn.id, UnitId(100));
        assert_eq!(pawn.owner, Some(P1));
        assert_eq!(pawn.pos, pos(0, 0));
        assert_eq!(resolution.units[&UnitId(100)], pawn.clone());
    }

    #[test]
    fn annihilation_tie_leaves_food_uneaten() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::pawn(UnitId(11), P2, pos(4, 2)),
            Unit::food(UnitId(99), pos(3, 2)),
        ]);
        let mut orders = TurnOrders::default();
        orders.set(P1, vec![mv(10, Direction::E)]);
        orders.set(P2, vec![mv(11, Direction::W)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        assert!(!resolution.units.contains_key(&UnitId(10)));
        assert!(!resolution.units.contains_key(&UnitId(11)));
        assert!(resolution.units.contains_key(&UnitId(99)));
        assert!(resolution.scheduled_spawns.is_empty());
    }

    #[test]
    fn majority_survivor_eats_after_combat() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::pawn(UnitId(12), P1, pos(3, 1)),
            Unit::pawn(UnitId(11), P2, pos(4, 2)),
            Unit::food(UnitId(99), pos(3, 2)),
        ]);
        let mut orders = TurnOrders::default();
        orders.set(P1, vec![mv(10, Direction::E), mv(12, Direction::S)]);
        orders.set(P2, vec![mv(11, Direction::W)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        // Lowest ids paired off and died; the remaining P1 pawn eats.
        assert!(!resolution.units.contains_key(&UnitId(10)));
        assert!(!resolution.units.contains_key(&UnitId(11)));
        assert_eq!(resolution.units[&UnitId(12)].pos, pos(3, 2));
        assert!(!resolution.units.contains_key(&UnitId(99)));
        assert_eq!(resolution.scheduled_spawns, vec![P1]);
    }

    #[test]
    fn base_destruction_takes_every_pawn_on_the_tile() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(4, 3)),
            Unit::pawn(UnitId(11), P2, pos(0, 4)),
        ]);
        let orders = TurnOrders::single(P1, vec![mv(10, Direction::S)]);

        let (resolution, _) = resolve(&state, orders, &[]);
        assert!(!resolution.units.contains_key(&UnitId(2)));
        assert!(!resolution.units.contains_key(&UnitId(10)));
        assert!(resolution.units.contains_key(&UnitId(11)));
        assert_eq!(resolution.base_captures, vec![P1]);
    }

    #[test]
    fn spawn_suppressed_when_base_fell_this_turn() {
        let state = base_state([Unit::pawn(UnitId(10), P1, pos(4, 3))]);
        let orders = TurnOrders::single(P1, vec![mv(10, Direction::S)]);

        // P2 earned a spawn last turn, but its base falls this turn.
        let (resolution, _) = resolve(&state, orders, &[P2]);
        assert!(resolution.spawned.is_empty());
        assert_eq!(resolution.base_captures, vec![P1]);
    }

    #[test]
    fn spawn_suppressed_by_enemy_pawn_on_base_tile() {
        let state = base_state([Unit::pawn(UnitId(10), P2, pos(0, 0))]);
        let (resolution, _) = resolve(&state, TurnOrders::default(), &[P1]);
        assert!(resolution.spawned.is_empty());
    }

    #[test]
    fn empty_orders_leave_positions_unchanged() {
        let state = base_state([
            Unit::pawn(UnitId(10), P1, pos(2, 2)),
            Unit::food(UnitId(99), pos(1, 1)),
        ]);
        let (resolution, _) = resolve(&state, TurnOrders::default(), &[]);
        assert_eq!(resolution.units.len(), state.units.len());
        for (id, unit) in &state.units {
            assert_eq!(resolution.units[id].pos, unit.pos);
        }
    }
}
