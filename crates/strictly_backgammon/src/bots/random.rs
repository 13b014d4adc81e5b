//! Uniformly random bot.

use super::{Bot, BotError, legal_plays};
use crate::action::Move;
use crate::game::Game;
use crate::match_play::MatchContext;
use crate::registry::PluginInfo;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Picks uniformly among legal plays, rarely doubles, takes half the time.
#[derive(Debug)]
pub struct RandomBot {
    info: PluginInfo,
    rng: Mutex<StdRng>,
}

impl RandomBot {
    /// A bot seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A reproducible bot.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            info: Self::plugin_info(),
            rng: Mutex::new(rng),
        }
    }

    /// Registry metadata.
    pub fn plugin_info() -> PluginInfo {
        PluginInfo::new("random", "Random bot", 0, false)
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // A poisoned RNG is still a usable RNG.
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Bot for RandomBot {
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
        let plays = legal_plays(game)?;
        if plays.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.rng().gen_range(0..plays.len());
        debug!(index, count = plays.len(), "Random play chosen");
        Ok(plays[index].moves().to_vec())
    }

    async fn should_double(
        &self,
        game: &Game,
        _context: &MatchContext,
        _cancel: &CancellationToken,
    ) -> Result<bool, BotError> {
        Ok(game.can_double(game.on_roll()) && self.rng().gen_bool(0.05))
    }

    async fn should_take(
        &self,
        _game: &Game,
        _context: &MatchContext,
        _cancel: &CancellationToken,
    ) -> Result<bool, BotError> {
        Ok(self.rng().gen_bool(0.5))
    }
}
