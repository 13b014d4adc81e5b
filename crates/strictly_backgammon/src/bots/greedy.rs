//! Single-ply greedy bot.

use super::{Bot, BotError, legal_plays};
use crate::action::Move;
use crate::board::Board;
use crate::eval::{CubeRecommendation, CubeThresholds, HeuristicEvaluator, PositionFeatures};
use crate::game::Game;
use crate::match_play::MatchContext;
use crate::registry::PluginInfo;
use crate::types::Color;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Scores each resulting board with simple greedy rules: hit, make points,
/// bear off, leave few blots.
#[derive(Debug, Clone)]
pub struct GreedyBot {
    info: PluginInfo,
    cube: HeuristicEvaluator,
}

impl GreedyBot {
    /// Creates a greedy bot; `thresholds` govern its cube actions.
    pub fn new(thresholds: CubeThresholds) -> Self {
        Self {
            info: Self::plugin_info(),
            cube: HeuristicEvaluator::new(thresholds),
        }
    }

    /// Registry metadata.
    pub fn plugin_info() -> PluginInfo {
        PluginInfo::new("greedy", "Greedy bot", 20, false)
    }

    /// Greedy score of `after` for `color`, compared with `before`.
    pub fn score(before: &Board, after: &Board, color: Color) -> f64 {
        let opponent = color.opponent();
        let mine = PositionFeatures::extract(after, color);
        let theirs = PositionFeatures::extract(after, opponent);
        let hits = after.bar(opponent).saturating_sub(before.bar(opponent));
        let pips_moved = before.pip_count(color).saturating_sub(after.pip_count(color));
        3.0 * hits as f64
            + 2.0 * mine.home_points as f64
            + 1.0 * mine.prime as f64
            + 2.0 * mine.off as f64
            - 1.5 * mine.direct_blots as f64
            - 0.5 * mine.indirect_blots as f64
            + 0.5 * theirs.bar as f64
            + 0.05 * pips_moved as f64
    }
}

impl Default for GreedyBot {
    fn default() -> Self {
        Self::new(CubeThresholds::default())
    }
}

#[async_trait]
impl Bot for GreedyBot {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn choose_play(
        &self,
        game: &Game,
        _context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Move>, BotError> {
        if cancel.is_cancelled() {
            return Err(BotError::Cancelled);
        }
        let color = game.on_roll();
        let before = game.board();
        let best = legal_plays(game)?
            .into_iter()
            .map(|seq| (Self::score(before, seq.result(), color), seq))
            .max_by(|(a, _), (b, _)| a.total_cmp(b));
        match best {
            Some((score, seq)) => {
                debug!(score, play = %seq, "Greedy play chosen");
                Ok(seq.into_moves())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn should_double(
        &self,
        game: &Game,
        context: &MatchContext,
        _cancel: &CancellationToken,
    ) -> Result<bool, BotError> {
        if !game.can_double(game.on_roll()) {
            return Ok(false);
        }
        let decision = self
            .cube
            .cube_decision(game.board(), game.on_roll(), game.cube(), context);
        Ok(decision.recommendation == CubeRecommendation::Double)
    }

    async fn should_take(
        &self,
        game: &Game,
        context: &MatchContext,
        _cancel: &CancellationToken,
    ) -> Result<bool, BotError> {
        let taker = game.on_roll().opponent();
        let decision = self.cube.cube_decision(game.board(), taker, game.cube(), context);
        Ok(decision.recommendation != CubeRecommendation::Pass)
    }
}
