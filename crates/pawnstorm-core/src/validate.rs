//! Per-action validation (the turn-loop's first filter).
//!
//! Invalid actions never fail a turn: they are dropped here with a
//! structured reason and the coordinator tells the offender once.

use std::collections::BTreeSet;

use pawnstorm_protocol::{Action, Direction, PlayerId, UnitId};

use crate::GameState;

/// One validated movement order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub unit: UnitId,
    pub dir: Direction,
}

/// Why a submitted action was dropped.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("unit {0} does not exist")]
    UnknownUnit(UnitId),
    #[error("unit {0} belongs to the opponent")]
    ForeignUnit(UnitId),
    #[error("unit {0} cannot be commanded")]
    NotAPawn(UnitId),
    #[error("unit {0}: no direction given")]
    MissingDirection(UnitId),
    #[error("unit {unit}: unknown direction `{given}`")]
    UnknownDirection { unit: UnitId, given: String },
    #[error("unit {0} was ordered twice; keeping the first order")]
    DuplicateOrder(UnitId),
}

/// A dropped action paired with its reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedAction {
    pub action: Action,
    pub reason: ActionError,
}

/// The validator's verdicts for one player's submission: the orders that
/// will move pawns, in submission order, plus everything dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatedActions {
    pub moves: Vec<Move>,
    pub rejected: Vec<RejectedAction>,
}

impl ValidatedActions {
    /// The first rejection reason, for the single `INVALID_OPERATION`
    /// message the coordinator sends per offending player.
    pub fn first_rejection(&self) -> Option<&ActionError> {
        self.rejected.first().map(|r| &r.reason)
    }
}

/// Pure verdict function: no state is touched, order is preserved.
pub fn validate_actions(
    state: &GameState,
    player: PlayerId,
    actions: &[Action],
) -> ValidatedActions {
    let mut out = ValidatedActions::default();
    let mut ordered: BTreeSet<UnitId> = BTreeSet::new();

    for action in actions {
        let verdict = judge(state, player, action, &ordered);
        match verdict {
            Ok(mv) => {
                ordered.insert(mv.unit);
                out.moves.push(mv);
            }
            Err(reason) => out.rejected.push(RejectedAction {
                action: action.clone(),
                reason,
            }),
        }
    }

    out
}

fn judge(
    state: &GameState,
    player: PlayerId,
    action: &Action,
    ordered: &BTreeSet<UnitId>,
) -> Result<Move, ActionError> {
    let id = action.unit_id;

    let unit = state.unit(id).ok_or(ActionError::UnknownUnit(id))?;
    if unit.owner != Some(player) {
        return Err(ActionError::ForeignUnit(id));
    }
    if !unit.is_pawn() {
        return Err(ActionError::NotAPawn(id));
    }

    let raw = action
        .direction
        .as_deref()
        .ok_or(ActionError::MissingDirection(id))?;
    let dir: Direction = raw.parse().map_err(|_| ActionError::UnknownDirection {
        unit: id,
        given: raw.to_string(),
    })?;

    if ordered.contains(&id) {
        return Err(ActionError::DuplicateOrder(id));
    }

    Ok(Move { unit: id, dir })
}
