//! Match scoring and the Crawford rule.

use crate::dice::DiceSource;
use crate::game::Game;
use crate::mode::GameMode;
use crate::outcome::{GameResult, Outcome};
use crate::types::Color;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Identifier of a game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("game-{}", _0)]
pub struct GameId(pub u32);

/// Scores and Crawford state seen by evaluators and the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchContext {
    target_score: u32,
    player1_score: u32,
    player2_score: u32,
    is_crawford_game: bool,
    has_crawford_game_been_played: bool,
}

impl MatchContext {
    /// Builds a context, deriving the Crawford flag from the scores.
    pub fn new(target_score: u32, player1_score: u32, player2_score: u32, crawford_played: bool) -> Self {
        let at_crawford = |score: u32| target_score > 0 && score + 1 == target_score;
        Self {
            target_score,
            player1_score,
            player2_score,
            is_crawford_game: !crawford_played && (at_crawford(player1_score) || at_crawford(player2_score)),
            has_crawford_game_been_played: crawford_played,
        }
    }

    /// An unlimited money session: no target, gammons always count.
    pub fn money_game() -> Self {
        Self::new(0, 0, 0, false)
    }

    /// Match length, or 0 for money play.
    pub fn target_score(&self) -> u32 {
        self.target_score
    }

    /// Score of White (player 1).
    pub fn player1_score(&self) -> u32 {
        self.player1_score
    }

    /// Score of Red (player 2).
    pub fn player2_score(&self) -> u32 {
        self.player2_score
    }

    /// Whether the current game is the Crawford game.
    pub fn is_crawford_game(&self) -> bool {
        self.is_crawford_game
    }

    /// Whether the Crawford game has been played already.
    pub fn has_crawford_game_been_played(&self) -> bool {
        self.has_crawford_game_been_played
    }

    /// Whether this is money play.
    pub fn is_money_game(&self) -> bool {
        self.target_score == 0
    }

    /// Score of `color`.
    pub fn score(&self, color: Color) -> u32 {
        match color {
            Color::White => self.player1_score,
            Color::Red => self.player2_score,
        }
    }

    /// Points `color` still needs, or `None` in money play.
    pub fn away(&self, color: Color) -> Option<u32> {
        if self.is_money_game() {
            None
        } else {
            Some(self.target_score.saturating_sub(self.score(color)))
        }
    }

    /// Whether a gammon win by `color` is worth more than a single game.
    pub fn gammon_counts_for(&self, color: Color) -> bool {
        self.away(color).is_none_or(|away| away > 1)
    }
}

impl Default for MatchContext {
    fn default() -> Self {
        Self::money_game()
    }
}

/// Who the human is playing against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpponentKind {
    /// Another human.
    Human,
    /// A bot, by registry id.
    Bot(String),
}

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Games remain to be played.
    InProgress,
    /// A player reached the target.
    Completed {
        /// Match winner.
        winner: Color,
    },
    /// Stopped early.
    Abandoned,
}

/// Reasons a match operation is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum MatchError {
    /// Target score must be at least 1.
    #[display("Match target must be at least 1 point")]
    InvalidTarget,
    /// The match is completed or abandoned.
    #[display("Match is no longer in progress")]
    NotInProgress,
    /// A game is still being played.
    #[display("{} is still in progress", _0)]
    GameInProgress(GameId),
    /// The id is not the current game.
    #[display("{} is not the current game", _0)]
    UnknownGame(GameId),
    /// The dice never broke the opening tie.
    #[display("Opening roll could not be decided")]
    OpeningUndecided,
}

impl std::error::Error for MatchError {}

/// A completed game in the match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Game id.
    pub id: GameId,
    /// How the game ended.
    pub outcome: Outcome,
    /// Whether it was the Crawford game.
    pub crawford: bool,
    /// Points credited.
    pub points: u32,
}

/// A match to a target score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    target: u32,
    opponent: OpponentKind,
    scores: [u32; 2],
    crawford_played: bool,
    status: MatchStatus,
    next_id: u32,
    current: Option<(GameId, bool)>,
    records: Vec<GameRecord>,
}

impl Match {
    /// Creates a match to `target` points.
    #[instrument]
    pub fn new(target: u32, opponent: OpponentKind) -> Result<Self, MatchError> {
        if target == 0 {
            return Err(MatchError::InvalidTarget);
        }
        info!(target, "Match created");
        Ok(Self {
            target,
            opponent,
            scores: [0, 0],
            crawford_played: false,
            status: MatchStatus::InProgress,
            next_id: 1,
            current: None,
            records: Vec::new(),
        })
    }

    /// Match length.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Opponent kind.
    pub fn opponent(&self) -> &OpponentKind {
        &self.opponent
    }

    /// Score of `color`.
    pub fn score(&self, color: Color) -> u32 {
        self.scores[color.index()]
    }

    /// Lifecycle status.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Id of the game in progress.
    pub fn current_game(&self) -> Option<GameId> {
        self.current.map(|(id, _)| id)
    }

    /// Finished games.
    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    /// Context for the next (or current) game, Crawford flag derived from scores.
    pub fn context(&self) -> MatchContext {
        MatchContext::new(self.target, self.scores[0], self.scores[1], self.crawford_played)
    }

    /// Starts the next game, recomputing the Crawford flag.
    #[instrument(skip(self, dice))]
    pub fn start_next_game<D: DiceSource + ?Sized>(
        &mut self,
        mode: GameMode,
        dice: &mut D,
    ) -> Result<(GameId, Game), MatchError> {
        if self.status != MatchStatus::InProgress {
            return Err(MatchError::NotInProgress);
        }
        if let Some((id, _)) = self.current {
            return Err(MatchError::GameInProgress(id));
        }
        let crawford = self.context().is_crawford_game();
        let game = Game::new(mode, crawford, dice).map_err(|_| MatchError::OpeningUndecided)?;
        let id = GameId(self.next_id);
        self.next_id += 1;
        self.current = Some((id, crawford));
        info!(%id, crawford, "Starting match game");
        Ok((id, game))
    }

    /// Credits a finished game and returns the new status.
    ///
    /// The match keeps no game state of its own: it checks that `id` is the
    /// current game and credits whatever `outcome` the caller reports.
    /// An abandoned game scores nothing and does not use up the Crawford game.
    #[instrument(skip(self))]
    pub fn complete_game(&mut self, id: GameId, outcome: &Outcome) -> Result<MatchStatus, MatchError> {
        if self.status != MatchStatus::InProgress {
            return Err(MatchError::NotInProgress);
        }
        let crawford = match self.current {
            Some((current, crawford)) if current == id => crawford,
            _ => {
                warn!(%id, "Completion for unknown game");
                return Err(MatchError::UnknownGame(id));
            }
        };
        self.current = None;
        let points = outcome.result().map(GameResult::points).unwrap_or(0);
        if let Some(result) = outcome.result() {
            self.scores[result.winner.index()] += points;
            if crawford {
                self.crawford_played = true;
            }
            if self.scores[result.winner.index()] >= self.target {
                self.status = MatchStatus::Completed {
                    winner: result.winner,
                };
            }
        }
        self.records.push(GameRecord {
            id,
            outcome: *outcome,
            crawford,
            points,
        });
        info!(
            white = self.scores[0],
            red = self.scores[1],
            status = ?self.status,
            "Game credited"
        );
        Ok(self.status)
    }

    /// Stops the match; scores are preserved.
    #[instrument(skip(self))]
    pub fn abandon(&mut self) -> Result<(), MatchError> {
        if self.status != MatchStatus::InProgress {
            return Err(MatchError::NotInProgress);
        }
        self.status = MatchStatus::Abandoned;
        self.current = None;
        info!("Match abandoned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::FixedDice;
    use crate::outcome::WinType;

    fn win(winner: Color, win_type: WinType, cube_value: u32) -> Outcome {
        Outcome::Won(GameResult {
            winner,
            win_type,
            cube_value,
        })
    }

    fn play(m: &mut Match, outcome: Outcome) -> (bool, MatchStatus) {
        let (id, game) = m
            .start_next_game(GameMode::Standard, &mut FixedDice::new([3, 1]))
            .unwrap();
        let status = m.complete_game(id, &outcome).unwrap();
        (game.is_crawford(), status)
    }

    #[test]
    fn test_crawford_fires_once() {
        let mut m = Match::new(5, OpponentKind::Human).unwrap();
        let (crawford, _) = play(&mut m, win(Color::White, WinType::Gammon, 2));
        assert!(!crawford);
        assert_eq!(m.score(Color::White), 4);
        assert!(m.context().is_crawford_game());

        let (crawford, status) = play(&mut m, win(Color::Red, WinType::Normal, 1));
        assert!(crawford);
        assert_eq!(status, MatchStatus::InProgress);
        assert!(!m.context().is_crawford_game());

        let (crawford, _) = play(&mut m, win(Color::Red, WinType::Normal, 1));
        assert!(!crawford);
    }

    #[test]
    fn test_completion_at_target() {
        let mut m = Match::new(3, OpponentKind::Bot("greedy".into())).unwrap();
        let (_, status) = play(&mut m, win(Color::Red, WinType::Backgammon, 1));
        assert_eq!(status, MatchStatus::Completed { winner: Color::Red });
        assert_eq!(
            m.start_next_game(GameMode::Standard, &mut FixedDice::new([3, 1])).unwrap_err(),
            MatchError::NotInProgress
        );
    }

    #[test]
    fn test_abandoned_game_scores_nothing() {
        let mut m = Match::new(5, OpponentKind::Human).unwrap();
        play(&mut m, win(Color::White, WinType::Gammon, 2));
        let (crawford, _) = play(&mut m, Outcome::Abandoned);
        assert!(crawford);
        assert!(m.context().is_crawford_game());
        assert_eq!(m.score(Color::White), 4);
    }

    #[test]
    fn test_one_game_at_a_time() {
        let mut m = Match::new(5, OpponentKind::Human).unwrap();
        let (id, _) = m
            .start_next_game(GameMode::Standard, &mut FixedDice::new([3, 1]))
            .unwrap();
        assert_eq!(
            m.start_next_game(GameMode::Standard, &mut FixedDice::new([3, 1])).unwrap_err(),
            MatchError::GameInProgress(id)
        );
        assert_eq!(
            m.complete_game(GameId(99), &Outcome::Abandoned),
            Err(MatchError::UnknownGame(GameId(99)))
        );
    }

    #[test]
    fn test_undecided_opening_leaves_no_game_in_progress() {
        let mut m = Match::new(5, OpponentKind::Human).unwrap();
        assert_eq!(
            m.start_next_game(GameMode::Standard, &mut FixedDice::new([2])).unwrap_err(),
            MatchError::OpeningUndecided
        );
        assert!(m.start_next_game(GameMode::Standard, &mut FixedDice::new([3, 1])).is_ok());
    }

    #[test]
    fn test_gammon_counts_only_when_not_one_away() {
        let ctx = MatchContext::new(5, 4, 0, true);
        assert!(!ctx.gammon_counts_for(Color::White));
        assert!(ctx.gammon_counts_for(Color::Red));
        assert!(MatchContext::money_game().gammon_counts_for(Color::White));
    }
}
