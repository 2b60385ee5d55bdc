//! `GameEngine`: the authoritative session state and the one place a
//! turn gets applied.
//!
//! The engine owns the unit-id allocator, the seeded RNG, the pending
//! spawn list, and the delta history. The server's turn coordinator calls
//! [`GameEngine::advance_turn`] exactly once per turn; everything else is
//! read-only access.

use std::collections::BTreeMap;

use pawnstorm_protocol::{GameDelta, PlayerId, StateSnapshot, Unit, UnitId};

use crate::{
    end, food, resolve_turn, EndRules, GameMap, GameOutcome, GameRng, GameState, TurnOrders,
};

/// Hands out session-scoped unit ids; an id is never reused.
#[derive(Clone, Copy, Debug)]
pub struct UnitIdAllocator {
    next: u32,
}

impl UnitIdAllocator {
    pub fn starting_at(first: UnitId) -> Self {
        Self { next: first.0 }
    }

    /// Continue issuing after the highest id already in play.
    pub fn after_units<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Self {
        let highest = units.into_iter().map(|u| u.id.0).max().unwrap_or(0);
        Self { next: highest + 1 }
    }

    pub fn allocate(&mut self) -> UnitId {
        let id = UnitId(self.next);
        self.next += 1;
        id
    }
}

/// Per-session rule knobs, fixed at engine construction.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Per-turn food drop probability, in `[0, 1]`.
    pub food_scarcity: f32,
    pub end_rules: EndRules,
    /// RNG seed; defaults to `start_at` when absent.
    pub seed: Option<u64>,
    /// Session start, epoch milliseconds.
    pub start_at: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            food_scarcity: 0.1,
            end_rules: EndRules::default(),
            seed: None,
            start_at: 0,
        }
    }
}

/// What one applied turn produced.
#[derive(Clone, Debug)]
pub struct TurnReport {
    /// The turn that was applied (0-based).
    pub turn_id: u32,
    pub delta: GameDelta,
    /// `Some` when this turn ended the game.
    pub outcome: Option<GameOutcome>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid setup: {0}")]
    Setup(String),
    /// The updater broke a structural invariant. Fatal for the session.
    #[error("invariant violated after turn {turn}: {detail}")]
    Invariant { turn: u32, detail: String },
    #[error("the game already ended")]
    GameOver,
}

#[derive(Debug)]
pub struct GameEngine {
    map: GameMap,
    state: GameState,
    config: EngineConfig,
    rng: GameRng,
    ids: UnitIdAllocator,
    pending_spawns: Vec<PlayerId>,
    turn: u32,
    history: Vec<GameDelta>,
    outcome: Option<GameOutcome>,
}

impl GameEngine {
    /// Build an engine over an initial board. The initial units must
    /// already satisfy the structural invariants; a bad setup is refused.
    pub fn new(
        map: GameMap,
        initial_units: Vec<Unit>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let ids = UnitIdAllocator::after_units(initial_units.iter());
        let mut seen = BTreeMap::new();
        for unit in &initial_units {
            if seen.insert(unit.id, ()).is_some() {
                return Err(EngineError::Setup(format!("duplicate unit id {}", unit.id)));
            }
        }

        let state = GameState::new(initial_units, config.start_at);
        check_invariants(&state.units, &map).map_err(EngineError::Setup)?;

        let rng = GameRng::seed_from_u64(config.seed.unwrap_or(config.start_at));
        Ok(Self {
            map,
            state,
            config,
            rng,
            ids,
            pending_spawns: Vec::new(),
            turn: 0,
            history: Vec::new(),
            outcome: None,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// The turn currently open for submissions (0-based).
    pub fn turn_id(&self) -> u32 {
        self.turn
    }

    pub fn history(&self) -> &[GameDelta] {
        &self.history
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Apply one turn: movement and collisions, spawn materialization,
    /// the food roll, then the end check. `now_ms` stamps the delta.
    pub fn advance_turn(
        &mut self,
        orders: &TurnOrders,
        now_ms: u64,
    ) -> Result<TurnReport, EngineError> {
        if self.outcome.is_some() {
            return Err(EngineError::GameOver);
        }

        let resolution = resolve_turn(
            &self.state,
            &self.map,
            orders,
            &self.pending_spawns,
            &mut self.ids,
        );

        let mut next = GameState {
            units: resolution.units,
            start_at: self.state.start_at,
        };
        food::roll_food_spawn(
            &mut next,
            &self.map,
            self.config.food_scarcity,
            &mut self.rng,
            &mut self.ids,
        );

        check_invariants(&next.units, &self.map).map_err(|detail| EngineError::Invariant {
            turn: self.turn,
            detail,
        })?;

        let delta = diff(&self.state.units, &next.units, now_ms);
        let applied = self.turn;

        self.state = next;
        self.pending_spawns = resolution.scheduled_spawns;
        self.turn += 1;
        self.history.push(delta.clone());

        let outcome = end::evaluate(
            &self.state,
            &resolution.base_captures,
            self.turn,
            &self.config.end_rules,
        );
        self.outcome = outcome;

        Ok(TurnReport {
            turn_id: applied,
            delta,
            outcome,
        })
    }
}

/// Units that appeared or moved, and ids that vanished.
fn diff(
    prev: &BTreeMap<UnitId, Unit>,
    next: &BTreeMap<UnitId, Unit>,
    timestamp: u64,
) -> GameDelta {
    let added_or_modified = next
        .values()
        .filter(|unit| prev.get(&unit.id) != Some(*unit))
        .cloned()
        .collect();
    let removed = prev
        .keys()
        .filter(|id| !next.contains_key(id))
        .copied()
        .collect();
    GameDelta {
        added_or_modified,
        removed,
        timestamp,
    }
}

/// The structural invariants that must hold after every turn.
fn check_invariants(units: &BTreeMap<UnitId, Unit>, map: &GameMap) -> Result<(), String> {
    let mut base_count = [0usize; 2];
    let mut pawn_owners: BTreeMap<_, [bool; 2]> = BTreeMap::new();

    for unit in units.values() {
        if !map.is_open(unit.pos) {
            return Err(format!("unit {} sits on {} off the open board", unit.id, unit.pos));
        }
        match (unit.is_food(), unit.owner) {
            (true, Some(owner)) => {
                return Err(format!("food {} has owner {}", unit.id, owner));
            }
            (false, None) => {
                return Err(format!("unit {} has no owner", unit.id));
            }
            _ => {}
        }
        if unit.is_base() {
            if let Some(owner) = unit.owner {
                base_count[owner.0 as usize] += 1;
            }
        }
        if unit.is_pawn() {
            if let Some(owner) = unit.owner {
                pawn_owners.entry((unit.pos.y, unit.pos.x)).or_default()
                    [owner.0 as usize] = true;
            }
        }
    }

    for (player, count) in PlayerId::PAIR.into_iter().zip(base_count) {
        if count > 1 {
            return Err(format!("{player} has {count} bases"));
        }
    }
    for ((y, x), owners) in pawn_owners {
        if owners[0] && owners[1] {
            return Err(format!(
                "enemy pawns share the tile ({x}, {y})"
            ));
        }
    }

    Ok(())
}
