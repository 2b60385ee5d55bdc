//! End-of-game evaluation, run after every applied turn.

use serde::{Deserialize, Serialize};

use pawnstorm_protocol::PlayerId;

use crate::GameState;

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// An attacker destroyed the enemy base. Awarded even if the
    /// attacking pawn died in the act.
    BaseDestroyed,
    /// A player (or both) ran out of a base or of pawns.
    Elimination,
    /// The configured turn limit was reached.
    TurnLimit,
}

/// Final verdict of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    /// `None` is a draw.
    pub winner: Option<PlayerId>,
    pub reason: EndReason,
}

/// Turn-limit configuration. `turn_limit_winner` covers the single-player
/// tutorial variant where surviving to the limit is a loss.
#[derive(Clone, Copy, Debug, Default)]
pub struct EndRules {
    pub max_turns: Option<u32>,
    pub turn_limit_winner: Option<PlayerId>,
}

/// Decide whether the game just ended. Checks, in order: base captures
/// from this turn, standing (base + at least one pawn), turn limit.
pub fn evaluate(
    state: &GameState,
    base_captures: &[PlayerId],
    turns_played: u32,
    rules: &EndRules,
) -> Option<GameOutcome> {
    let mut captors: Vec<PlayerId> = base_captures.to_vec();
    captors.dedup();
    match captors[..] {
        [winner] => {
            return Some(GameOutcome {
                winner: Some(winner),
                reason: EndReason::BaseDestroyed,
            })
        }
        [_, ..] => {
            // Both bases fell on the same turn.
            return Some(GameOutcome {
                winner: None,
                reason: EndReason::BaseDestroyed,
            });
        }
        [] => {}
    }

    let standing: Vec<PlayerId> = PlayerId::PAIR
        .into_iter()
        .filter(|&p| state.base_of(p).is_some() && state.pawn_count(p) > 0)
        .collect();
    match standing[..] {
        [winner] => {
            return Some(GameOutcome {
                winner: Some(winner),
                reason: EndReason::Elimination,
            })
        }
        [] => {
            return Some(GameOutcome {
                winner: None,
                reason: EndReason::Elimination,
            })
        }
        _ => {}
    }

    if let Some(max_turns) = rules.max_turns {
        if turns_played >= max_turns {
            return Some(GameOutcome {
                winner: rules.turn_limit_winner,
                reason: EndReason::TurnLimit,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawnstorm_protocol::{Position, Unit, UnitId};

    const P1: PlayerId = PlayerId::ONE;
    const P2: PlayerId = PlayerId::TWO;

    fn full_board() -> GameState {
        GameState::new(
            [
                Unit::base(UnitId(1), P1, Position::new(0, 0)),
                Unit::base(UnitId(2), P2, Position::new(4, 4)),
                Unit::pawn(UnitId(10), P1, Position::new(1, 1)),
                Unit::pawn(UnitId(11), P2, Position::new(3, 3)),
            ],
            0,
        )
    }

    #[test]
    fn game_continues_while_both_stand() {
        assert_eq!(evaluate(&full_board(), &[], 5, &EndRules::default()), None);
    }

    #[test]
    fn capture_wins_even_if_the_attacker_died_attacking() {
        // P1's only pawn died destroying the base; the capture still wins.
        let state = GameState::new(
            [
                Unit::base(UnitId(1), P1, Position::new(0, 0)),
                Unit::pawn(UnitId(11), P2, Position::new(3, 3)),
            ],
            0,
        );
        assert_eq!(
            evaluate(&state, &[P1], 5, &EndRules::default()),
            Some(GameOutcome {
                winner: Some(P1),
                reason: EndReason::BaseDestroyed
            })
        );
    }

    #[test]
    fn simultaneous_capture_is_a_draw() {
        let state = GameState::new([], 0);
        assert_eq!(
            evaluate(&state, &[P1, P2], 5, &EndRules::default()),
            Some(GameOutcome {
                winner: None,
                reason: EndReason::BaseDestroyed
            })
        );
    }

    #[test]
    fn lone_standing_player_wins() {
        let state = GameState::new(
            [
                Unit::base(UnitId(1), P1, Position::new(0, 0)),
                Unit::base(UnitId(2), P2, Position::new(4, 4)),
                Unit::pawn(UnitId(10), P1, Position::new(1, 1)),
            ],
            0,
        );
        assert_eq!(
            evaluate(&state, &[], 5, &EndRules::default()),
            Some(GameOutcome {
                winner: Some(P1),
                reason: EndReason::Elimination
            })
        );
    }

    #[test]
    fn nobody_standing_is_a_draw() {
        let state = GameState::new(
            [
                Unit::base(UnitId(1), P1, Position::new(0, 0)),
                Unit::base(UnitId(2), P2, Position::new(4, 4)),
            ],
            0,
        );
        assert_eq!(
            evaluate(&state, &[], 5, &EndRules::default()),
            Some(GameOutcome {
                winner: None,
                reason: EndReason::Elimination
            })
        );
    }

    #[test]
    fn turn_limit_draws_by_default() {
        let rules = EndRules {
            max_turns: Some(10),
            turn_limit_winner: None,
        };
        assert_eq!(evaluate(&full_board(), &[], 9, &rules), None);
        assert_eq!(
            evaluate(&full_board(), &[], 10, &rules),
            Some(GameOutcome {
                winner: None,
                reason: EndReason::TurnLimit
            })
        );
    }

    #[test]
    fn tutorial_turn_limit_awards_the_opponent() {
        let rules = EndRules {
            max_turns: Some(10),
            turn_limit_winner: Some(P2),
        };
        assert_eq!(
            evaluate(&full_board(), &[], 10, &rules),
            Some(GameOutcome {
                winner: Some(P2),
                reason: EndReason::TurnLimit
            })
        );
    }
}
