//! [`Evaluator`] backed by a gnubg process.

use crate::commands;
use crate::config::GnubgConfig;
use crate::parser::{self, HintLine};
use crate::runner::GnubgRunner;
use async_trait::async_trait;
use strictly_backgammon::{
    BestMovesAnalysis, Board, Color, CubeDecision, DiceRoll, DoublingCube, Evaluator,
    EvaluatorError, MatchContext, MoveGenerator, MoveSequence, PluginInfo, PositionEvaluation,
    RankedPlay, notation,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Evaluates positions with GNU Backgammon.
#[derive(Debug)]
pub struct GnubgEvaluator {
    info: PluginInfo,
    runner: GnubgRunner,
}

impl GnubgEvaluator {
    /// Registry metadata.
    pub fn plugin_info() -> PluginInfo {
        PluginInfo::new("gnubg", "GNU Backgammon", 95, true)
    }

    /// Creates an evaluator running gnubg per `config`.
    pub fn new(config: GnubgConfig) -> Self {
        Self {
            info: Self::plugin_info(),
            runner: GnubgRunner::new(config),
        }
    }

    /// The process runner.
    pub fn runner(&self) -> &GnubgRunner {
        &self.runner
    }

    fn plies(&self) -> u8 {
        *self.runner.config().plies()
    }
}

/// Maps hint lines onto generated plays, dropping lines that match none.
fn rank_hints(
    board: &Board,
    color: Color,
    dice: &[u8],
    hints: &[HintLine],
    legal: &[MoveSequence],
) -> Vec<RankedPlay> {
    let mut ranked: Vec<RankedPlay> = Vec::new();
    for hint in hints {
        match notation::resolve(board, color, dice, &hint.notation) {
            Ok(sequence) => {
                if ranked.iter().any(|play| play.moves == sequence.moves()) {
                    continue;
                }
                ranked.push(RankedPlay::from_sequence(&sequence, hint.equity));
            }
            Err(e) => warn!(rank = hint.rank, notation = %hint.notation, error = %e, "Dropping hint line"),
        }
    }
    if ranked.len() < hints.len() {
        debug!(legal = legal.len(), kept = ranked.len(), "Some hint lines were not legal plays");
    }
    ranked
}

#[async_trait]
impl Evaluator for GnubgEvaluator {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn is_available(&self) -> bool {
        self.runner.is_available().await
    }

    #[instrument(skip(self, board, context, cancel), fields(%color))]
    async fn evaluate_position(
        &self,
        board: &Board,
        color: Color,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<PositionEvaluation, EvaluatorError> {
        let script = commands::evaluation(self.plies(), board, color, context);
        let output = self.runner.execute(&script, cancel).await?;
        let evaluation = parser::parse_evaluation(&output)?;
        info!(equity = evaluation.equity, win = evaluation.win, "gnubg evaluation");
        Ok(evaluation)
    }

    #[instrument(skip(self, board, context, cancel), fields(%color, %dice))]
    async fn find_best_moves(
        &self,
        board: &Board,
        color: Color,
        dice: DiceRoll,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<BestMovesAnalysis, EvaluatorError> {
        let values = dice.values();
        let legal = MoveGenerator::sequences(board, color, &values);
        if legal.is_empty() {
            debug!("No legal play, skipping gnubg");
            return Ok(BestMovesAnalysis::default());
        }
        let script = commands::hint(self.plies(), board, color, dice, context);
        let output = self.runner.execute(&script, cancel).await?;
        let hints = parser::parse_move_analysis(&output);
        let ranked = rank_hints(board, color, &values, &hints, &legal);
        if ranked.is_empty() {
            warn!(lines = hints.len(), "No gnubg hint matched a legal play");
            return Err(EvaluatorError::Parse(
                "gnubg hint output contained no legal play".into(),
            ));
        }
        info!(plays = ranked.len(), "gnubg ranked plays");
        Ok(BestMovesAnalysis::new(ranked).retain_legal(&legal))
    }

    #[instrument(skip(self, board, cube, context, cancel), fields(%color))]
    async fn analyze_cube_decision(
        &self,
        board: &Board,
        color: Color,
        cube: &DoublingCube,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<CubeDecision, EvaluatorError> {
        // A pending offer is judged from the doubler's side, then answered.
        let responding = cube.pending_offer().filter(|&offerer| offerer != color);
        let doubler = responding.unwrap_or(color);
        let script = commands::cube(self.plies(), board, doubler, cube, context);
        let output = self.runner.execute(&script, cancel).await?;
        let decision = parser::parse_cube_decision(&output)?;
        let decision = match responding {
            Some(_) => CubeDecision {
                recommendation: decision.response(),
                ..decision
            },
            None => decision,
        };
        info!(recommendation = %decision.recommendation, "gnubg cube decision");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_mapped_onto_generated_plays() {
        let board = Board::new();
        let legal = MoveGenerator::sequences(&board, Color::White, &[3, 1]);
        let hints = vec![
            HintLine {
                rank: 1,
                notation: "8/5 6/5".into(),
                equity: 0.16,
            },
            HintLine {
                rank: 2,
                notation: "13/7".into(),
                equity: 0.1,
            },
            HintLine {
                rank: 3,
                notation: "24/21 24/23".into(),
                equity: -0.02,
            },
        ];
        let ranked = rank_hints(&board, Color::White, &[3, 1], &hints, &legal);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].equity, 0.16);
        assert!(legal.iter().any(|seq| seq.moves() == ranked[1].moves.as_slice()));
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let evaluator =
            GnubgEvaluator::new(GnubgConfig::default().with_executable("strictly-gnubg-missing"));
        assert!(!evaluator.is_available().await);
        let err = evaluator
            .evaluate_position(
                &Board::new(),
                Color::White,
                &MatchContext::money_game(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::Unavailable(_)));
    }
}
