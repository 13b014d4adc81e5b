//! Bot decision layer.
//!
//! Bots read a [`Game`] and answer three questions: which play to make,
//! whether to double, and whether to take. They never touch game state;
//! callers feed the chosen moves back into the game as ordinary moves.

mod evaluator_backed;
mod greedy;
mod random;

pub use evaluator_backed::EvaluatorBackedBot;
pub use greedy::GreedyBot;
pub use random::RandomBot;

use crate::action::Move;
use crate::eval::EvaluatorError;
use crate::game::Game;
use crate::match_play::MatchContext;
use crate::movegen::MoveSequence;
use crate::registry::PluginInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Errors from bot decisions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BotError {
    /// The evaluator failed and the bot is configured to propagate.
    #[display("Evaluation unavailable: {}", _0)]
    EvaluationUnavailable(EvaluatorError),
    /// The caller cancelled the decision.
    #[display("Decision cancelled")]
    Cancelled,
    /// The game is not waiting for a play.
    #[display("No play to choose: the game is not awaiting a move")]
    NoLegalPlay,
}

impl std::error::Error for BotError {}

/// What a bot does when its evaluator fails.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackPolicy {
    /// Play the first generated play, never double, always take.
    #[default]
    FirstLegal,
    /// Return [`BotError::EvaluationUnavailable`].
    Propagate,
}

/// A pluggable player.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Plugin metadata.
    fn info(&self) -> &PluginInfo;

    /// Whether the bot can decide now.
    async fn is_available(&self) -> bool {
        true
    }

    /// Chooses a full play for the color on roll.
    ///
    /// Returns an empty list when the dice cannot be played.
    async fn choose_play(
        &self,
        game: &Game,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Move>, BotError>;

    /// Whether the color on roll should double before rolling.
    async fn should_double(
        &self,
        game: &Game,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<bool, BotError>;

    /// Whether the color facing a double should take it.
    async fn should_take(
        &self,
        game: &Game,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<bool, BotError>;
}

/// Legal plays for the game's current dice, or an error if none are rolled.
pub(crate) fn legal_plays(game: &Game) -> Result<Vec<MoveSequence>, BotError> {
    if !game.turn().rolled() || game.is_over() {
        return Err(BotError::NoLegalPlay);
    }
    Ok(game.legal_sequences())
}
