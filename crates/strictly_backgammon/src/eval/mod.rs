//! Position evaluator contract.
//!
//! Evaluators are read-only: they never mutate game state, so a cancelled
//! call simply returns nothing. Implementations backed by an external
//! process flag `requires_external_resources` and must honour the
//! cancellation token.

mod heuristic;

pub use heuristic::{CubeThresholds, HeuristicEvaluator, PositionFeatures};

use crate::action::Move;
use crate::board::Board;
use crate::cube::DoublingCube;
use crate::dice::DiceRoll;
use crate::match_play::MatchContext;
use crate::movegen::MoveSequence;
use crate::registry::PluginInfo;
use crate::types::Color;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Errors from evaluator calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum EvaluatorError {
    /// The caller cancelled the request.
    #[display("Evaluation cancelled")]
    Cancelled,
    /// The evaluation exceeded its time budget.
    #[display("Evaluation timed out after {} ms", _0)]
    Timeout(u64),
    /// The evaluator cannot run (e.g. its engine is not installed).
    #[display("Evaluator unavailable: {}", _0)]
    Unavailable(String),
    /// The external process failed.
    #[display("Evaluator process failed: {}", _0)]
    Process(String),
    /// Output could not be understood.
    #[display("Could not parse evaluator output: {}", _0)]
    Parse(String),
    /// The request itself was invalid.
    #[display("Invalid evaluation request: {}", _0)]
    InvalidRequest(String),
}

impl std::error::Error for EvaluatorError {}

/// Probabilities and equity from one side's point of view.
///
/// `win_gammon` includes backgammons; `win_backgammon` counts them again.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionEvaluation {
    /// Expected points per unit cube.
    pub equity: f64,
    /// Probability of winning.
    pub win: f64,
    /// Probability of winning a gammon or better.
    pub win_gammon: f64,
    /// Probability of winning a backgammon.
    pub win_backgammon: f64,
    /// Probability of losing a gammon or worse.
    pub lose_gammon: f64,
    /// Probability of losing a backgammon.
    pub lose_backgammon: f64,
}

/// One candidate play with its equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlay {
    /// The moves, in playing order.
    pub moves: Vec<Move>,
    /// Equity for the mover after the play.
    pub equity: f64,
    /// Pips moved.
    pub pips: u32,
}

impl RankedPlay {
    /// Ranks a generated sequence.
    pub fn from_sequence(sequence: &MoveSequence, equity: f64) -> Self {
        Self {
            moves: sequence.moves().to_vec(),
            equity,
            pips: sequence.pips_moved(),
        }
    }

    fn rank(&self, other: &Self) -> Ordering {
        other
            .equity
            .total_cmp(&self.equity)
            .then(self.pips.cmp(&other.pips))
            .then_with(|| self.moves.cmp(&other.moves))
    }
}

/// Candidate plays ordered best first.
///
/// Order: descending equity, then fewer pips moved, then lexicographic moves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BestMovesAnalysis {
    plays: Vec<RankedPlay>,
}

impl BestMovesAnalysis {
    /// Sorts `plays` into ranking order.
    pub fn new(mut plays: Vec<RankedPlay>) -> Self {
        plays.sort_by(RankedPlay::rank);
        Self { plays }
    }

    /// Plays, best first.
    pub fn top_moves(&self) -> &[RankedPlay] {
        &self.plays
    }

    /// The best play, if any.
    pub fn best(&self) -> Option<&RankedPlay> {
        self.plays.first()
    }

    /// Whether no play was found.
    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    /// Drops every play that is not one of `legal`.
    ///
    /// Evaluators never invent moves; anything outside the generator's
    /// output is discarded with a warning.
    pub fn retain_legal(mut self, legal: &[MoveSequence]) -> Self {
        let before = self.plays.len();
        self.plays
            .retain(|play| legal.iter().any(|seq| seq.moves() == play.moves.as_slice()));
        if self.plays.len() != before {
            warn!(dropped = before - self.plays.len(), "Discarded plays outside the legal set");
        }
        self
    }
}

/// Cube action recommendation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum CubeRecommendation {
    /// Keep playing without doubling.
    NoDouble,
    /// Double; the opponent should take.
    Double,
    /// Too good to double; play on for a gammon.
    TooGood,
    /// Accept the offered double.
    Take,
    /// Decline the offered double.
    Pass,
}

/// Cube analysis. Equities are from the doubler's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubeDecision {
    /// Equity if no double is offered.
    pub no_double_equity: f64,
    /// Equity after double and take.
    pub double_take_equity: f64,
    /// Equity after double and pass.
    pub double_pass_equity: f64,
    /// Recommended action for the color asked about.
    pub recommendation: CubeRecommendation,
}

impl CubeDecision {
    /// Derives the doubler's recommendation from the three equities.
    pub fn from_equities(no_double: f64, double_take: f64, double_pass: f64) -> Self {
        let double_value = double_take.min(double_pass);
        let recommendation = if double_value <= no_double {
            if no_double > double_pass {
                CubeRecommendation::TooGood
            } else {
                CubeRecommendation::NoDouble
            }
        } else {
            CubeRecommendation::Double
        };
        Self {
            no_double_equity: no_double,
            double_take_equity: double_take,
            double_pass_equity: double_pass,
            recommendation,
        }
    }

    /// The taker's answer: take when taking costs less than passing.
    pub fn response(&self) -> CubeRecommendation {
        match self.recommendation {
            CubeRecommendation::Take | CubeRecommendation::Pass => self.recommendation,
            _ if self.double_take_equity > self.double_pass_equity => CubeRecommendation::Pass,
            _ => CubeRecommendation::Take,
        }
    }
}

/// The evaluator capability set.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Plugin metadata.
    fn info(&self) -> &PluginInfo;

    /// Whether the evaluator can run now.
    async fn is_available(&self) -> bool;

    /// Evaluates `board` for `color`, who is on roll.
    async fn evaluate_position(
        &self,
        board: &Board,
        color: Color,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<PositionEvaluation, EvaluatorError>;

    /// Ranks every legal play of `dice` for `color`.
    async fn find_best_moves(
        &self,
        board: &Board,
        color: Color,
        dice: DiceRoll,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<BestMovesAnalysis, EvaluatorError>;

    /// Recommends a cube action for `color`.
    ///
    /// With a double pending from the opponent the answer is `Take` or
    /// `Pass`; otherwise `NoDouble`, `Double` or `TooGood`.
    async fn analyze_cube_decision(
        &self,
        board: &Board,
        color: Color,
        cube: &DoublingCube,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<CubeDecision, EvaluatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn play(equity: f64, pips: u32, from: u8) -> RankedPlay {
        RankedPlay {
            moves: vec![Move::new(Location::Point(from), Location::Point(from - 1), 1, false)],
            equity,
            pips,
        }
    }

    #[test]
    fn test_ranking_breaks_ties_deterministically() {
        let analysis = BestMovesAnalysis::new(vec![
            play(0.1, 4, 8),
            play(0.3, 8, 13),
            play(0.3, 4, 24),
            play(0.3, 4, 13),
        ]);
        let order: Vec<(f64, u32)> = analysis.top_moves().iter().map(|p| (p.equity, p.pips)).collect();
        assert_eq!(order, vec![(0.3, 4), (0.3, 4), (0.3, 8), (0.1, 4)]);
        assert_eq!(analysis.best().unwrap().moves[0].from, Location::Point(13));
    }

    #[test]
    fn test_cube_decision_from_equities() {
        assert_eq!(
            CubeDecision::from_equities(0.2, 0.3, 1.0).recommendation,
            CubeRecommendation::Double
        );
        assert_eq!(
            CubeDecision::from_equities(0.2, 0.1, 1.0).recommendation,
            CubeRecommendation::NoDouble
        );
        assert_eq!(
            CubeDecision::from_equities(1.2, 1.6, 1.0).recommendation,
            CubeRecommendation::TooGood
        );
        assert_eq!(CubeDecision::from_equities(0.6, 1.4, 1.0).response(), CubeRecommendation::Pass);
    }
}
