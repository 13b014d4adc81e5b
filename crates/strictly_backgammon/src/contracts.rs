//! Contract-based validation for backgammon moves.
//!
//! Preconditions are checked on every move; postconditions re-verify the
//! invariant set in debug builds.

use crate::action::{GameError, IllegalMove, Move};
use crate::game::Game;
use crate::invariants::{BackgammonInvariants, InvariantSet};
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// Preconditions and postconditions for a state transition.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), GameError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), GameError>;
}

// ─────────────────────────────────────────────────────────────
//  Move Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the die is still available this turn.
pub struct DieAvailable;

impl DieAvailable {
    /// Checks that `mv.die` is among the remaining dice.
    pub fn check(mv: &Move, game: &Game) -> Result<(), GameError> {
        if game.turn().remaining().contains(&mv.die) {
            Ok(())
        } else {
            Err(IllegalMove::DieNotAvailable(mv.die).into())
        }
    }
}

/// Precondition: the move starts some maximal legal play.
pub struct OnMaximalPath;

impl OnMaximalPath {
    /// Checks `mv` against the generator's playable moves.
    #[instrument(skip(game), fields(mv = %mv))]
    pub fn check(mv: &Move, game: &Game) -> Result<(), GameError> {
        let playable = game.playable_moves();
        if playable
            .iter()
            .any(|m| m.connects(mv.from, mv.to) && m.die == mv.die)
        {
            return Ok(());
        }
        // Board-level reason first, then maximality.
        game.board().check_move(game.on_roll(), mv.from, mv.die)?;
        Err(IllegalMove::NotMaximal {
            from: mv.from,
            to: mv.to,
        }
        .into())
    }
}

// ─────────────────────────────────────────────────────────────
//  Move Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for checker moves.
///
/// Preconditions: the die is available and the move lies on a maximal play.
/// Postconditions: checker conservation, exclusive points, cube power of two,
/// and exactly one checker moved.
pub struct MoveContract;

impl Contract<Game, Move> for MoveContract {
    fn pre(game: &Game, action: &Move) -> Result<(), GameError> {
        DieAvailable::check(action, game)?;
        OnMaximalPath::check(action, game)
    }

    fn post(before: &Game, after: &Game) -> Result<(), GameError> {
        BackgammonInvariants::check_all(after).map_err(|violations| {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%descriptions, "Postcondition failed");
            GameError::InvariantViolation(format!("Postcondition failed: {}", descriptions))
        })?;
        let color = before.on_roll();
        let moved = before.board().pip_count(color).abs_diff(after.board().pip_count(color));
        if moved == 0 || moved > 6 {
            return Err(GameError::InvariantViolation(format!(
                "A single move changed {}'s pip count by {}",
                color, moved
            )));
        }
        Ok(())
    }
}
