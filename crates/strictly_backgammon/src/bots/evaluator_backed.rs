//! Bot that delegates every decision to an [`Evaluator`].

use super::{Bot, BotError, FallbackPolicy, legal_plays};
use crate::action::Move;
use crate::eval::{CubeRecommendation, Evaluator, EvaluatorError};
use crate::game::Game;
use crate::match_play::MatchContext;
use crate::registry::PluginInfo;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Wraps any evaluator with a time budget and a fallback policy.
///
/// One evaluator query is in flight per decision. A failed or timed-out
/// query falls back to a deterministic default or is propagated, and the
/// chosen play is always checked against the generator's legal set.
pub struct EvaluatorBackedBot {
    info: PluginInfo,
    evaluator: Arc<dyn Evaluator>,
    timeout: Duration,
    fallback: FallbackPolicy,
}

impl EvaluatorBackedBot {
    /// Creates a bot around `evaluator`.
    pub fn new(
        info: PluginInfo,
        evaluator: Arc<dyn Evaluator>,
        timeout: Duration,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            info,
            evaluator,
            timeout,
            fallback,
        }
    }

    /// The wrapped evaluator.
    pub fn evaluator(&self) -> &Arc<dyn Evaluator> {
        &self.evaluator
    }

    /// Runs one evaluator query under the time budget and the caller's token.
    async fn query<T, F>(&self, cancel: &CancellationToken, call: impl FnOnce(CancellationToken) -> F) -> Result<T, EvaluatorError>
    where
        F: Future<Output = Result<T, EvaluatorError>>,
    {
        let child = cancel.child_token();
        let fut = call(child.clone());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EvaluatorError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, fut) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    child.cancel();
                    Err(EvaluatorError::Timeout(self.timeout.as_millis() as u64))
                }
            },
        }
    }

    /// Applies the fallback policy to a failed query.
    fn fall_back<T>(&self, error: EvaluatorError, default: T) -> Result<T, BotError> {
        match (error, self.fallback) {
            (EvaluatorError::Cancelled, _) => Err(BotError::Cancelled),
            (error, FallbackPolicy::Propagate) => {
                warn!(bot = %self.info.id(), %error, "Evaluation failed, propagating");
                Err(BotError::EvaluationUnavailable(error))
            }
            (error, FallbackPolicy::FirstLegal) => {
                warn!(bot = %self.info.id(), %error, "Evaluation failed, using fallback");
                Ok(default)
            }
        }
    }
}

impl std::fmt::Debug for EvaluatorBackedBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorBackedBot")
            .field("info", &self.info)
            .field("evaluator", self.evaluator.info().id())
            .field("timeout", &self.timeout)
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[async_trait]
impl Bot for EvaluatorBackedBot {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn is_available(&self) -> bool {
        self.evaluator.is_available().await
    }

    #[instrument(skip_all, fields(bot = %self.info.id(), color = %game.on_roll()))]
    async fn choose_play(
        &self,
        game: &Game,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Move>, BotError> {
        let legal = legal_plays(game)?;
        let Some(first) = legal.first() else {
            return Ok(Vec::new());
        };
        let Some(dice) = game.turn().dice() else {
            return Err(BotError::NoLegalPlay);
        };
        let board = *game.board();
        let color = game.on_roll();
        let evaluator = Arc::clone(&self.evaluator);
        let result = self
            .query(cancel, |token| async move {
                evaluator
                    .find_best_moves(&board, color, dice, context, &token)
                    .await
            })
            .await;

        let result = result.and_then(|analysis| {
            analysis
                .retain_legal(&legal)
                .best()
                .map(|play| play.moves.clone())
                .ok_or_else(|| EvaluatorError::Parse("no legal play in evaluator output".to_string()))
        });
        match result {
            Ok(moves) => {
                debug!(play = ?moves, "Evaluator play chosen");
                Ok(moves)
            }
            Err(error) => self.fall_back(error, first.moves().to_vec()),
        }
    }

    #[instrument(skip_all, fields(bot = %self.info.id()))]
    async fn should_double(
        &self,
        game: &Game,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<bool, BotError> {
        let color = game.on_roll();
        if !game.can_double(color) {
            return Ok(false);
        }
        let board = *game.board();
        let cube = *game.cube();
        let evaluator = Arc::clone(&self.evaluator);
        let result = self
            .query(cancel, |token| async move {
                evaluator
                    .analyze_cube_decision(&board, color, &cube, context, &token)
                    .await
            })
            .await;
        match result {
            Ok(decision) => Ok(decision.recommendation == CubeRecommendation::Double),
            Err(error) => self.fall_back(error, false),
        }
    }

    #[instrument(skip_all, fields(bot = %self.info.id()))]
    async fn should_take(
        &self,
        game: &Game,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<bool, BotError> {
        let taker = game.on_roll().opponent();
        let board = *game.board();
        let cube = *game.cube();
        let evaluator = Arc::clone(&self.evaluator);
        let result = self
            .query(cancel, |token| async move {
                evaluator
                    .analyze_cube_decision(&board, taker, &cube, context, &token)
                    .await
            })
            .await;
        match result {
            Ok(decision) => Ok(decision.response() != CubeRecommendation::Pass),
            Err(error) => self.fall_back(error, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::cube::DoublingCube;
    use crate::dice::{DiceRoll, FixedDice};
    use crate::eval::{BestMovesAnalysis, CubeDecision, HeuristicEvaluator, PositionEvaluation};
    use crate::mode::GameMode;
    use crate::types::Color;

    /// Evaluator that never answers.
    struct Stalled(PluginInfo);

    #[async_trait]
    impl Evaluator for Stalled {
        fn info(&self) -> &PluginInfo {
            &self.0
        }

        async fn is_available(&self) -> bool {
            false
        }

        async fn evaluate_position(
            &self,
            _: &Board,
            _: Color,
            _: &MatchContext,
            cancel: &CancellationToken,
        ) -> Result<PositionEvaluation, EvaluatorError> {
            cancel.cancelled().await;
            Err(EvaluatorError::Cancelled)
        }

        async fn find_best_moves(
            &self,
            _: &Board,
            _: Color,
            _: DiceRoll,
            _: &MatchContext,
            cancel: &CancellationToken,
        ) -> Result<BestMovesAnalysis, EvaluatorError> {
            cancel.cancelled().await;
            Err(EvaluatorError::Cancelled)
        }

        async fn analyze_cube_decision(
            &self,
            _: &Board,
            _: Color,
            _: &DoublingCube,
            _: &MatchContext,
            cancel: &CancellationToken,
        ) -> Result<CubeDecision, EvaluatorError> {
            cancel.cancelled().await;
            Err(EvaluatorError::Cancelled)
        }
    }

    fn rolled_game() -> Game {
        let mut dice = FixedDice::opening(3, 1, &[]);
        let mut game = Game::new(GameMode::Standard, false, &mut dice).unwrap();
        game.roll(Color::White, &mut dice).unwrap();
        game
    }

    fn stalled_bot(fallback: FallbackPolicy) -> EvaluatorBackedBot {
        EvaluatorBackedBot::new(
            PluginInfo::new("stalled", "Stalled", 0, true),
            Arc::new(Stalled(PluginInfo::new("stalled", "Stalled", 0, true))),
            Duration::from_millis(20),
            fallback,
        )
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_first_legal() {
        let game = rolled_game();
        let play = stalled_bot(FallbackPolicy::FirstLegal)
            .choose_play(&game, &MatchContext::money_game(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(play, game.legal_sequences()[0].moves().to_vec());
    }

    #[tokio::test]
    async fn test_timeout_propagates_when_configured() {
        let game = rolled_game();
        let result = stalled_bot(FallbackPolicy::Propagate)
            .choose_play(&game, &MatchContext::money_game(), &CancellationToken::new())
            .await;
        assert_eq!(result, Err(BotError::EvaluationUnavailable(EvaluatorError::Timeout(20))));
    }

    #[tokio::test]
    async fn test_caller_cancellation_wins() {
        let game = rolled_game();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = stalled_bot(FallbackPolicy::FirstLegal)
            .choose_play(&game, &MatchContext::money_game(), &cancel)
            .await;
        assert_eq!(result, Err(BotError::Cancelled));
    }

    #[tokio::test]
    async fn test_heuristic_backed_play_is_legal() {
        let game = rolled_game();
        let bot = EvaluatorBackedBot::new(
            PluginInfo::new("heuristic", "Heuristic", 40, false),
            Arc::new(HeuristicEvaluator::default()),
            Duration::from_secs(5),
            FallbackPolicy::Propagate,
        );
        let play = bot
            .choose_play(&game, &MatchContext::money_game(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(game.legal_sequences().iter().any(|s| s.moves() == play.as_slice()));
    }
}
