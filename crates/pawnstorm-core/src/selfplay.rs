//! Headless self-play harness.
//!
//! Drives two scripted bots through the engine with no transport at all,
//! the same in-process pattern the tutorial driver uses. Useful for smoke
//! testing determinism and for eyeballing rule balance.

use serde::{Deserialize, Serialize};

use pawnstorm_protocol::{Direction, PlayerId, Position};

use crate::{
    arena, EndRules, EngineConfig, EngineError, GameEngine, GameOutcome, Move, TurnOrders,
};

/// Configuration for one self-play run.
#[derive(Clone, Debug)]
pub struct SelfPlayConfig {
    /// Arena template to play on.
    pub arena: String,
    /// RNG seed for the food generator.
    pub seed: u64,
    /// Per-turn food drop probability.
    pub food_scarcity: f32,
    /// Hard stop; reaching it is a draw.
    pub max_turns: u32,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            arena: arena::SKIRMISH.to_string(),
            seed: 42,
            food_scarcity: 0.1,
            max_turns: 200,
        }
    }
}

/// What a self-play run produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelfPlayResult {
    pub outcome: GameOutcome,
    pub turns_played: u32,
    /// Units alive at the end.
    pub final_units: usize,
    /// Pawns destroyed over the whole game.
    pub pawns_lost: usize,
}

/// Run one bot-vs-bot game to completion.
///
/// Both seats use the same greedy policy: every pawn steps toward the
/// enemy base. Deterministic for a fixed config.
pub fn run_selfplay(config: &SelfPlayConfig) -> Result<SelfPlayResult, EngineError> {
    let parsed =
        arena::parse(&config.arena).map_err(|e| EngineError::Setup(e.to_string()))?;
    let mut engine = GameEngine::new(
        parsed.map,
        parsed.units,
        EngineConfig {
            food_scarcity: config.food_scarcity,
            end_rules: EndRules {
                max_turns: Some(config.max_turns),
                turn_limit_winner: None,
            },
            seed: Some(config.seed),
            start_at: 0,
        },
    )?;

    let mut pawns_lost = 0usize;
    loop {
        let mut orders = TurnOrders::default();
        for player in PlayerId::PAIR {
            orders.set(player, greedy_moves(&engine, player));
        }

        let now = engine.turn_id() as u64;
        let report = engine.advance_turn(&orders, now)?;
        pawns_lost += report.delta.removed.len();

        if let Some(outcome) = report.outcome {
            return Ok(SelfPlayResult {
                outcome,
                turns_played: engine.turn_id(),
                final_units: engine.state().units.len(),
                pawns_lost,
            });
        }
    }
}

/// March every pawn one step toward the enemy base.
fn greedy_moves(engine: &GameEngine, player: PlayerId) -> Vec<Move> {
    let Some(goal) = engine.state().base_of(player.opponent()).map(|b| b.pos) else {
        return Vec::new();
    };
    engine
        .state()
        .units_of(player)
        .filter(|u| u.is_pawn())
        .filter_map(|pawn| {
            toward(pawn.pos, goal).map(|dir| Move {
                unit: pawn.id,
                dir,
            })
        })
        .collect()
}

fn toward(from: Position, to: Position) -> Option<Direction> {
    let step = ((to.x - from.x).signum(), (to.y - from.y).signum());
    Direction::ALL.into_iter().find(|d| d.offset() == step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EndReason;

    #[test]
    fn selfplay_terminates() {
        let result = run_selfplay(&SelfPlayConfig::default()).unwrap();
        assert!(result.turns_played > 0);
        assert!(result.turns_played <= 200);
    }

    #[test]
    fn selfplay_is_deterministic() {
        let a = run_selfplay(&SelfPlayConfig::default()).unwrap();
        let b = run_selfplay(&SelfPlayConfig::default()).unwrap();
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.turns_played, b.turns_played);
        assert_eq!(a.final_units, b.final_units);
        assert_eq!(a.pawns_lost, b.pawns_lost);
    }

    #[test]
    fn symmetric_greedy_bots_reach_a_verdict() {
        // Mirror-symmetric start with no food: the pawns meet and the
        // session resolves by annihilation or capture, never a hang.
        let config = SelfPlayConfig {
            food_scarcity: 0.0,
            max_turns: 50,
            ..SelfPlayConfig::default()
        };
        let result = run_selfplay(&config).unwrap();
        assert!(matches!(
            result.outcome.reason,
            EndReason::BaseDestroyed | EndReason::Elimination | EndReason::TurnLimit
        ));
    }
}
