//! Checker conservation: each color always owns exactly 15 checkers.

use super::Invariant;
use crate::types::{CHECKERS_PER_SIDE, Color};
use crate::{Board, Game};

/// Invariant: checkers on points, bar and borne off sum to 15 per color.
pub struct CheckerConservationInvariant;

impl Invariant<Board> for CheckerConservationInvariant {
    fn holds(board: &Board) -> bool {
        [Color::White, Color::Red]
            .into_iter()
            .all(|color| board.checker_total(color) == CHECKERS_PER_SIDE as u16)
    }

    fn description() -> &'static str {
        "Each color has exactly 15 checkers across points, bar and tray"
    }
}

impl Invariant<Game> for CheckerConservationInvariant {
    fn holds(game: &Game) -> bool {
        <Self as Invariant<Board>>::holds(game.board())
    }

    fn description() -> &'static str {
        <Self as Invariant<Board>>::description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    #[test]
    fn test_opening_board_holds() {
        assert!(<CheckerConservationInvariant as Invariant<Board>>::holds(&Board::new()));
    }

    #[test]
    fn test_partial_layout_counts_tray() {
        let board = Board::from_layout(&[(Location::Point(3), 4)], &[(Location::Bar, 1)])
            .expect("valid layout");
        assert_eq!(board.borne_off(Color::White), 11);
        assert!(<CheckerConservationInvariant as Invariant<Board>>::holds(&board));
    }
}
