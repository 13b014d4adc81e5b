//! Game and match sessions.
//!
//! Every game and match lives behind its own async mutex, so operations on
//! one id are applied strictly one after another while different ids
//! proceed independently. Lock order is match before game.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use strictly_backgammon::{
    Bot, BotError, Color, DiceRoll, DiceSource, Game, GameError, GameEvent, GameId, GameMode,
    GamePhase, Location, Match, MatchContext, MatchError, MatchStatus, Move, OpponentKind, Outcome,
    RandomDice, RollOutcome, notation,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Identifier of a match session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("match-{}", _0)]
pub struct MatchId(pub u32);

/// Who sits on one side of the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    /// A client submitting actions itself.
    #[display("human")]
    Human,
    /// A registry bot, driven through [`SessionManager::play_bot_turn`].
    #[display("bot:{}", _0)]
    Bot(String),
}

impl Seat {
    fn opponent_kind(&self) -> OpponentKind {
        match self {
            Seat::Human => OpponentKind::Human,
            Seat::Bot(id) => OpponentKind::Bot(id.clone()),
        }
    }
}

/// Broad category of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionErrorKind {
    /// No game or match with that id.
    NotFound,
    /// The game or match rejected the action.
    Rejected,
    /// The acting seat is not held by the given bot.
    WrongSeat,
    /// A bot failed to decide.
    Bot,
}

/// Session error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Session error ({}): {} at {}:{}", kind, message, file, line)]
pub struct SessionError {
    /// Category.
    pub kind: SessionErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SessionError {
    /// Creates a new session error with caller location tracking.
    #[track_caller]
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<GameError> for SessionError {
    #[track_caller]
    fn from(err: GameError) -> Self {
        Self::new(SessionErrorKind::Rejected, err.to_string())
    }
}

impl From<MatchError> for SessionError {
    #[track_caller]
    fn from(err: MatchError) -> Self {
        Self::new(SessionErrorKind::Rejected, err.to_string())
    }
}

impl From<BotError> for SessionError {
    #[track_caller]
    fn from(err: BotError) -> Self {
        Self::new(SessionErrorKind::Bot, err.to_string())
    }
}

/// A copy of one game session's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, new)]
pub struct GameSnapshot {
    /// Session-wide game id.
    id: GameId,
    /// Full game state.
    game: Game,
    /// White's seat.
    white: Seat,
    /// Red's seat.
    red: Seat,
    /// Owning match, if any.
    match_id: Option<MatchId>,
}

/// Produces the dice for each new game or match.
pub type DiceFactory = Arc<dyn Fn() -> Box<dyn DiceSource + Send> + Send + Sync>;

type Shared<T> = Arc<tokio::sync::Mutex<T>>;

struct GameEntry {
    game: Game,
    white: Seat,
    red: Seat,
    context: MatchContext,
    parent: Option<(MatchId, GameId)>,
    dice: Box<dyn DiceSource + Send>,
}

impl GameEntry {
    fn seat(&self, color: Color) -> &Seat {
        match color {
            Color::White => &self.white,
            Color::Red => &self.red,
        }
    }
}

struct MatchEntry {
    record: Match,
    white: Seat,
    red: Seat,
    current: Option<GameId>,
    dice: Box<dyn DiceSource + Send>,
}

/// The color whose decision the game is waiting for.
pub fn acting_color(game: &Game) -> Color {
    match game.cube().pending_offer() {
        Some(offerer) => offerer.opponent(),
        None => game.on_roll(),
    }
}

/// Owns all live games and matches.
#[derive(Clone)]
pub struct SessionManager {
    games: Arc<Mutex<HashMap<GameId, Shared<GameEntry>>>>,
    matches: Arc<Mutex<HashMap<MatchId, Shared<MatchEntry>>>>,
    next_id: Arc<AtomicU32>,
    dice: DiceFactory,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("games", &self.list_games())
            .field("matches", &self.list_matches())
            .finish()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// A manager rolling fresh random dice for every game.
    #[instrument]
    pub fn new() -> Self {
        Self::with_dice(Arc::new(|| {
            Box::new(RandomDice::from_entropy()) as Box<dyn DiceSource + Send>
        }))
    }

    /// A manager drawing dice from `factory`, one source per game or match.
    pub fn with_dice(factory: DiceFactory) -> Self {
        info!("Creating session manager");
        Self {
            games: Arc::new(Mutex::new(HashMap::new())),
            matches: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
            dice: factory,
        }
    }

    fn allocate(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn game_entry(&self, id: GameId) -> Result<Shared<GameEntry>, SessionError> {
        let games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        games.get(&id).cloned().ok_or_else(|| {
            debug!(%id, "Game not found");
            SessionError::new(SessionErrorKind::NotFound, format!("Unknown game {}", id))
        })
    }

    fn match_entry(&self, id: MatchId) -> Result<Shared<MatchEntry>, SessionError> {
        let matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        matches.get(&id).cloned().ok_or_else(|| {
            debug!(%id, "Match not found");
            SessionError::new(SessionErrorKind::NotFound, format!("Unknown match {}", id))
        })
    }

    fn insert_game(&self, entry: GameEntry) -> GameId {
        let id = GameId(self.allocate());
        let mut games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        games.insert(id, Arc::new(tokio::sync::Mutex::new(entry)));
        id
    }

    // ─────────────────────────────────────────────────────────────
    // Games
    // ─────────────────────────────────────────────────────────────

    /// Starts a standalone money game and returns its id.
    #[instrument(skip(self))]
    pub fn create_game(&self, white: Seat, red: Seat, mode: GameMode) -> Result<GameId, SessionError> {
        let mut dice = (self.dice)();
        let game = Game::new(mode, false, &mut *dice)?;
        let id = self.insert_game(GameEntry {
            game,
            white,
            red,
            context: MatchContext::money_game(),
            parent: None,
            dice,
        });
        info!(%id, "Game session created");
        Ok(id)
    }

    /// Ids of every game, in creation order.
    pub fn list_games(&self) -> Vec<GameId> {
        let games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<GameId> = games.keys().copied().collect();
        ids.sort();
        ids
    }

    /// A copy of the game's current state.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, id: GameId) -> Result<GameSnapshot, SessionError> {
        let entry = self.game_entry(id)?;
        let entry = entry.lock().await;
        Ok(GameSnapshot::new(
            id,
            entry.game.clone(),
            entry.white.clone(),
            entry.red.clone(),
            entry.parent.map(|(match_id, _)| match_id),
        ))
    }

    /// Every move playable next with the current dice.
    pub async fn valid_moves(&self, id: GameId) -> Result<Vec<Move>, SessionError> {
        let entry = self.game_entry(id)?;
        let entry = entry.lock().await;
        Ok(entry.game.playable_moves())
    }

    /// Rolls for `actor`.
    #[instrument(skip(self))]
    pub async fn roll(&self, id: GameId, actor: Color) -> Result<RollOutcome, SessionError> {
        let entry = self.game_entry(id)?;
        let mut guard = entry.lock().await;
        let entry = &mut *guard;
        Ok(entry.game.roll(actor, &mut *entry.dice)?)
    }

    /// Sets the dice manually (analysis games only).
    #[instrument(skip(self))]
    pub async fn set_dice(
        &self,
        id: GameId,
        actor: Color,
        roll: DiceRoll,
    ) -> Result<RollOutcome, SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        Ok(entry.game.set_dice(actor, roll)?)
    }

    /// Moves one checker.
    #[instrument(skip(self))]
    pub async fn apply_move(
        &self,
        id: GameId,
        actor: Color,
        from: Location,
        to: Location,
    ) -> Result<Move, SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        Ok(entry.game.apply_move(actor, from, to)?)
    }

    /// Plays a whole roll written in move notation, e.g. `8/5 6/5`.
    #[instrument(skip(self))]
    pub async fn play_notation(
        &self,
        id: GameId,
        actor: Color,
        text: &str,
    ) -> Result<Vec<Move>, SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        let color = entry.game.on_roll();
        let remaining = entry.game.turn().remaining().to_vec();
        let play = notation::resolve(entry.game.board(), color, &remaining, text)
            .map_err(|e| SessionError::new(SessionErrorKind::Rejected, e.to_string()))?;
        entry.game.play_sequence(actor, play.moves())?;
        Ok(play.into_moves())
    }

    /// Ends `actor`'s turn.
    #[instrument(skip(self))]
    pub async fn end_turn(&self, id: GameId, actor: Color) -> Result<(), SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        Ok(entry.game.end_turn(actor)?)
    }

    /// Offers the cube.
    #[instrument(skip(self))]
    pub async fn offer_double(&self, id: GameId, actor: Color) -> Result<(), SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        Ok(entry.game.offer_double(actor)?)
    }

    /// Takes a pending double, returning the new cube value.
    #[instrument(skip(self))]
    pub async fn accept_double(&self, id: GameId, actor: Color) -> Result<u32, SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        Ok(entry.game.accept_double(actor)?)
    }

    /// Passes a pending double, ending the game.
    #[instrument(skip(self))]
    pub async fn decline_double(&self, id: GameId, actor: Color) -> Result<Outcome, SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        Ok(entry.game.decline_double(actor)?)
    }

    /// Abandons a game without a winner.
    #[instrument(skip(self))]
    pub async fn abandon(&self, id: GameId) -> Result<(), SessionError> {
        let entry = self.game_entry(id)?;
        let mut entry = entry.lock().await;
        Ok(entry.game.abandon()?)
    }

    /// Lets `bot` act for its seat until the decision passes to the other side.
    ///
    /// Covers answering a pending double, offering one, rolling, playing and
    /// ending the turn. Returns the game events produced along the way. A
    /// double offered to a human seat stays pending.
    #[instrument(skip(self, bot, cancel), fields(bot = %bot.info().id()))]
    pub async fn play_bot_turn(
        &self,
        id: GameId,
        bot: &dyn Bot,
        cancel: &CancellationToken,
    ) -> Result<Vec<GameEvent>, SessionError> {
        let entry = self.game_entry(id)?;
        let mut guard = entry.lock().await;
        let entry = &mut *guard;

        let color = acting_color(&entry.game);
        if *entry.seat(color) != Seat::Bot(bot.info().id().clone()) {
            warn!(%color, seat = %entry.seat(color), "Bot does not hold the acting seat");
            return Err(SessionError::new(
                SessionErrorKind::WrongSeat,
                format!("{} is not seated as {}", bot.info().id(), color),
            ));
        }

        let start = entry.game.history().len();
        while !entry.game.is_over() {
            if let Some(offerer) = entry.game.cube().pending_offer() {
                if offerer != color {
                    if bot.should_take(&entry.game, &entry.context, cancel).await? {
                        entry.game.accept_double(color)?;
                    } else {
                        entry.game.decline_double(color)?;
                    }
                }
                break;
            }
            if entry.game.on_roll() != color {
                break;
            }
            match entry.game.phase() {
                GamePhase::AwaitingRoll => {
                    if entry.game.can_double(color)
                        && bot.should_double(&entry.game, &entry.context, cancel).await?
                    {
                        entry.game.offer_double(color)?;
                        continue;
                    }
                    entry.game.roll(color, &mut *entry.dice)?;
                }
                GamePhase::AwaitingMove => {
                    let moves = bot.choose_play(&entry.game, &entry.context, cancel).await?;
                    entry.game.play_sequence(color, &moves)?;
                }
                GamePhase::TurnComplete => entry.game.end_turn(color)?,
                GamePhase::GameOver(_) => break,
            }
        }
        let events = entry.game.history()[start..].to_vec();
        debug!(events = events.len(), "Bot turn finished");
        Ok(events)
    }

    // ─────────────────────────────────────────────────────────────
    // Matches
    // ─────────────────────────────────────────────────────────────

    /// Creates a match with White as a human client against `opponent`.
    #[instrument(skip(self))]
    pub fn create_match(&self, target: u32, opponent: OpponentKind) -> Result<MatchId, SessionError> {
        let red = match opponent {
            OpponentKind::Human => Seat::Human,
            OpponentKind::Bot(id) => Seat::Bot(id),
        };
        self.create_match_between(target, Seat::Human, red)
    }

    /// Creates a match between two arbitrary seats.
    #[instrument(skip(self))]
    pub fn create_match_between(
        &self,
        target: u32,
        white: Seat,
        red: Seat,
    ) -> Result<MatchId, SessionError> {
        let record = Match::new(target, red.opponent_kind())?;
        let id = MatchId(self.allocate());
        let entry = MatchEntry {
            record,
            white,
            red,
            current: None,
            dice: (self.dice)(),
        };
        let mut matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        matches.insert(id, Arc::new(tokio::sync::Mutex::new(entry)));
        info!(%id, target, "Match session created");
        Ok(id)
    }

    /// Ids of every match, in creation order.
    pub fn list_matches(&self) -> Vec<MatchId> {
        let matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<MatchId> = matches.keys().copied().collect();
        ids.sort();
        ids
    }

    /// A copy of the match record.
    pub async fn match_snapshot(&self, id: MatchId) -> Result<Match, SessionError> {
        let entry = self.match_entry(id)?;
        let entry = entry.lock().await;
        Ok(entry.record.clone())
    }

    /// Starts the match's next game as a new game session.
    #[instrument(skip(self))]
    pub async fn start_next_game(&self, id: MatchId, mode: GameMode) -> Result<GameId, SessionError> {
        let entry = self.match_entry(id)?;
        let mut guard = entry.lock().await;
        let entry = &mut *guard;
        let (local, game) = entry.record.start_next_game(mode, &mut *entry.dice)?;
        let game_id = self.insert_game(GameEntry {
            game,
            white: entry.white.clone(),
            red: entry.red.clone(),
            context: entry.record.context(),
            parent: Some((id, local)),
            dice: (self.dice)(),
        });
        entry.current = Some(game_id);
        info!(match_id = %id, %game_id, %local, "Match game started");
        Ok(game_id)
    }

    /// Credits the match's finished current game.
    #[instrument(skip(self))]
    pub async fn complete_game(&self, id: MatchId) -> Result<MatchStatus, SessionError> {
        let entry = self.match_entry(id)?;
        let mut entry = entry.lock().await;
        let game_id = entry.current.ok_or_else(|| {
            SessionError::new(SessionErrorKind::Rejected, format!("{} has no game in progress", id))
        })?;
        let game = self.game_entry(game_id)?;
        let game = game.lock().await;
        let outcome = game.game.outcome().ok_or_else(|| {
            SessionError::new(SessionErrorKind::Rejected, format!("{} is still being played", game_id))
        })?;
        let (_, local) = game.parent.ok_or_else(|| {
            SessionError::new(SessionErrorKind::Rejected, format!("{} is not a match game", game_id))
        })?;
        let status = entry.record.complete_game(local, &outcome)?;
        entry.current = None;
        info!(match_id = %id, %game_id, ?status, "Match game credited");
        Ok(status)
    }

    /// Abandons the match and any game still running in it.
    #[instrument(skip(self))]
    pub async fn abandon_match(&self, id: MatchId) -> Result<(), SessionError> {
        let entry = self.match_entry(id)?;
        let mut entry = entry.lock().await;
        if let Some(game_id) = entry.current.take() {
            let game = self.game_entry(game_id)?;
            let mut game = game.lock().await;
            if !game.game.is_over() {
                game.game.abandon()?;
            }
        }
        entry.record.abandon()?;
        Ok(())
    }
}
