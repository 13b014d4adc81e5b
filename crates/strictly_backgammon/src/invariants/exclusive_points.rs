//! Point exclusivity: a point never holds checkers of both colors.

use super::Invariant;
use crate::types::Point;
use crate::{Board, Game};

/// Invariant: every occupied point holds at least one checker of a single color.
///
/// The `Point` representation already rules out mixed colors; this catches
/// the degenerate `Occupied(_, 0)` state.
pub struct ExclusivePointsInvariant;

impl Invariant<Board> for ExclusivePointsInvariant {
    fn holds(board: &Board) -> bool {
        board
            .points()
            .iter()
            .all(|point| !matches!(point, Point::Occupied(_, 0)))
    }

    fn description() -> &'static str {
        "Occupied points hold one or more checkers of a single color"
    }
}

impl Invariant<Game> for ExclusivePointsInvariant {
    fn holds(game: &Game) -> bool {
        <Self as Invariant<Board>>::holds(game.board())
    }

    fn description() -> &'static str {
        <Self as Invariant<Board>>::description()
    }
}
