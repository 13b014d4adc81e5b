//! Game results and win-type classification.

use crate::board::Board;
use crate::types::{Color, POINTS};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// How completely the winner won.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum WinType {
    /// Loser bore off at least one checker.
    Normal,
    /// Loser bore off nothing.
    Gammon,
    /// Loser bore off nothing and still has a checker on the bar or in the
    /// winner's home board.
    Backgammon,
}

impl WinType {
    /// Point multiplier: 1, 2 or 3.
    pub fn multiplier(self) -> u32 {
        match self {
            WinType::Normal => 1,
            WinType::Gammon => 2,
            WinType::Backgammon => 3,
        }
    }

    /// Classifies a finished board from the loser's position.
    #[instrument(skip(board))]
    pub fn classify(board: &Board, winner: Color) -> Self {
        let loser = winner.opponent();
        if board.borne_off(loser) > 0 {
            return WinType::Normal;
        }
        let in_winners_home = (1..=POINTS)
            .filter(|&p| winner.is_home(p))
            .any(|p| board.checkers_at(loser, p) > 0);
        if board.bar(loser) > 0 || in_winners_home {
            WinType::Backgammon
        } else {
            WinType::Gammon
        }
    }
}

/// A classified win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameResult {
    /// Winning color.
    pub winner: Color,
    /// Win classification.
    pub win_type: WinType,
    /// Cube value at game end.
    pub cube_value: u32,
}

impl GameResult {
    /// Points scored: win-type multiplier times cube value.
    pub fn points(&self) -> u32 {
        self.win_type.multiplier() * self.cube_value
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} wins a {} ({} point{})",
            self.winner,
            self.win_type.to_string().to_lowercase(),
            self.points(),
            if self.points() == 1 { "" } else { "s" }
        )
    }
}

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// A color won.
    Won(GameResult),
    /// Abandoned; no winner is credited.
    Abandoned,
}

impl Outcome {
    /// Returns the result if a color won.
    pub fn result(&self) -> Option<&GameResult> {
        match self {
            Outcome::Won(result) => Some(result),
            Outcome::Abandoned => None,
        }
    }

    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Color> {
        self.result().map(|r| r.winner)
    }

    /// Returns true if the game was abandoned.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Outcome::Abandoned)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Won(result) => write!(f, "{}", result),
            Outcome::Abandoned => write!(f, "Abandoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    #[test]
    fn test_loser_bore_off_is_normal() {
        let board = Board::from_layout(&[], &[(Location::Point(20), 3)]).expect("layout");
        assert_eq!(WinType::classify(&board, Color::White), WinType::Normal);
    }

    #[test]
    fn test_gammon_without_stragglers() {
        let board = Board::from_layout(&[], &[(Location::Point(20), 15)]).expect("layout");
        assert_eq!(WinType::classify(&board, Color::White), WinType::Gammon);
    }

    #[test]
    fn test_backgammon_from_winners_home_or_bar() {
        let home = Board::from_layout(&[], &[(Location::Point(20), 14), (Location::Point(3), 1)])
            .expect("layout");
        assert_eq!(WinType::classify(&home, Color::White), WinType::Backgammon);
        let bar = Board::from_layout(&[], &[(Location::Point(20), 14), (Location::Bar, 1)])
            .expect("layout");
        assert_eq!(WinType::classify(&bar, Color::White), WinType::Backgammon);
    }

    #[test]
    fn test_red_winner_mirrors() {
        let board = Board::from_layout(&[(Location::Point(22), 15)], &[]).expect("layout");
        assert_eq!(WinType::classify(&board, Color::Red), WinType::Backgammon);
    }

    #[test]
    fn test_points_multiply_cube() {
        let result = GameResult {
            winner: Color::White,
            win_type: WinType::Gammon,
            cube_value: 2,
        };
        assert_eq!(result.points(), 4);
    }
}
