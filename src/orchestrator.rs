//! Bot-versus-bot match orchestration.

use crate::session::{MatchId, Seat, SessionManager, acting_color};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use strictly_backgammon::{Bot, Color, GameEvent, GameId, GameMode, Match, MatchStatus, Outcome};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Progress reports sent while a match is played.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A new game began.
    GameStarted {
        /// Session game id.
        game: GameId,
        /// Whether this is the Crawford game.
        crawford: bool,
    },
    /// Something happened inside a game.
    Game {
        /// Session game id.
        game: GameId,
        /// The game event.
        event: GameEvent,
    },
    /// A game ended.
    GameFinished {
        /// Session game id.
        game: GameId,
        /// How it ended.
        outcome: Outcome,
        /// White's match score afterwards.
        white_score: u32,
        /// Red's match score afterwards.
        red_score: u32,
    },
    /// The match is over.
    MatchFinished {
        /// Final status.
        status: MatchStatus,
    },
}

/// Plays complete matches between two bots.
pub struct MatchOrchestrator {
    sessions: SessionManager,
    white: Arc<dyn Bot>,
    red: Arc<dyn Bot>,
    events: mpsc::UnboundedSender<MatchEvent>,
    max_decisions: usize,
}

impl MatchOrchestrator {
    /// Creates an orchestrator playing in `sessions`.
    pub fn new(
        sessions: SessionManager,
        white: Arc<dyn Bot>,
        red: Arc<dyn Bot>,
        events: mpsc::UnboundedSender<MatchEvent>,
    ) -> Self {
        Self {
            sessions,
            white,
            red,
            events,
            max_decisions: 5_000,
        }
    }

    /// Caps bot decisions per game; a game exceeding it is abandoned.
    pub fn with_max_decisions(mut self, max_decisions: usize) -> Self {
        self.max_decisions = max_decisions;
        self
    }

    fn bot(&self, color: Color) -> &dyn Bot {
        match color {
            Color::White => self.white.as_ref(),
            Color::Red => self.red.as_ref(),
        }
    }

    fn emit(&self, event: MatchEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    /// Plays a match to `target` points and returns the final record.
    ///
    /// Cancellation abandons the match.
    #[instrument(skip(self, cancel), fields(white = %self.white.info().id(), red = %self.red.info().id()))]
    pub async fn run(&self, target: u32, cancel: &CancellationToken) -> Result<Match> {
        let match_id = self.sessions.create_match_between(
            target,
            Seat::Bot(self.white.info().id().clone()),
            Seat::Bot(self.red.info().id().clone()),
        )?;
        info!(%match_id, target, "Match started");

        loop {
            let record = self.sessions.match_snapshot(match_id).await?;
            if record.status() != MatchStatus::InProgress {
                self.emit(MatchEvent::MatchFinished {
                    status: record.status(),
                });
                info!(status = ?record.status(), "Match finished");
                return Ok(record);
            }
            if cancel.is_cancelled() {
                warn!("Match cancelled");
                self.sessions.abandon_match(match_id).await?;
                continue;
            }
            if let Err(e) = self.play_game(match_id, cancel).await {
                if cancel.is_cancelled() {
                    warn!("Match cancelled");
                    self.sessions.abandon_match(match_id).await?;
                    continue;
                }
                return Err(e);
            }
        }
    }

    async fn play_game(&self, match_id: MatchId, cancel: &CancellationToken) -> Result<()> {
        let game_id = self
            .sessions
            .start_next_game(match_id, GameMode::Standard)
            .await?;
        let crawford = self.sessions.snapshot(game_id).await?.game().is_crawford();
        self.emit(MatchEvent::GameStarted {
            game: game_id,
            crawford,
        });

        let mut decisions = 0;
        loop {
            let snapshot = self.sessions.snapshot(game_id).await?;
            if snapshot.game().is_over() {
                break;
            }
            if cancel.is_cancelled() {
                anyhow::bail!("{} cancelled", game_id);
            }
            if decisions >= self.max_decisions {
                warn!(%game_id, decisions, "Decision cap reached, abandoning game");
                self.sessions.abandon(game_id).await?;
                break;
            }
            let color = acting_color(snapshot.game());
            let events = self
                .sessions
                .play_bot_turn(game_id, self.bot(color), cancel)
                .await
                .with_context(|| format!("{} failed to act in {}", color, game_id))?;
            for event in events {
                self.emit(MatchEvent::Game {
                    game: game_id,
                    event,
                });
            }
            decisions += 1;
        }

        let outcome = self
            .sessions
            .snapshot(game_id)
            .await?
            .game()
            .outcome()
            .context("finished game has no outcome")?;
        self.sessions.complete_game(match_id).await?;
        let record = self.sessions.match_snapshot(match_id).await?;
        self.emit(MatchEvent::GameFinished {
            game: game_id,
            outcome,
            white_score: record.score(Color::White),
            red_score: record.score(Color::Red),
        });
        Ok(())
    }
}
