//! Per-game turn and cube state machine.
//!
//! `AwaitingRoll -> AwaitingMove -> TurnComplete -> AwaitingRoll (other color)`,
//! with `GameOver` reachable the instant a color bears off its 15th checker,
//! when a double is declined, or when the game is abandoned.

use crate::action::{GameError, IllegalMove, Move};
use crate::board::Board;
use crate::contracts::{Contract, MoveContract};
use crate::cube::{CubeError, DoublingCube};
use crate::dice::{DiceRoll, DiceSource};
use crate::mode::GameMode;
use crate::movegen::{MoveGenerator, MoveSequence};
use crate::outcome::{GameResult, Outcome, WinType};
use crate::types::{CHECKERS_PER_SIDE, Color, Location};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Where the game is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// The color on roll must roll (or double first).
    AwaitingRoll,
    /// Dice are rolled and at least one legal move remains.
    AwaitingMove,
    /// Every playable die is used; the turn awaits `end_turn`.
    TurnComplete,
    /// Terminal.
    GameOver(Outcome),
}

/// The mutable per-turn record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    color: Color,
    dice: Option<DiceRoll>,
    remaining: Vec<u8>,
    moves: Vec<Move>,
}

impl Turn {
    fn new(color: Color) -> Self {
        Self {
            color,
            dice: None,
            remaining: Vec::new(),
            moves: Vec::new(),
        }
    }

    /// Color playing this turn.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Dice rolled, if any.
    pub fn dice(&self) -> Option<DiceRoll> {
        self.dice
    }

    /// Die values not yet played.
    pub fn remaining(&self) -> &[u8] {
        &self.remaining
    }

    /// Moves applied so far this turn.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Whether the dice have been rolled.
    pub fn rolled(&self) -> bool {
        self.dice.is_some()
    }
}

/// Entries in the game record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A finished turn.
    Turn(Turn),
    /// A double was offered.
    DoubleOffered(Color),
    /// A double was taken; the cube now shows `value`.
    DoubleAccepted {
        /// Accepting color, now cube owner.
        by: Color,
        /// New cube value.
        value: u32,
    },
    /// A double was passed.
    DoubleDeclined(Color),
    /// The game was abandoned.
    Abandoned,
}

/// Result of rolling the dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    /// The dice thrown.
    pub dice: DiceRoll,
    /// No die could be played; the turn passed to the opponent.
    pub no_legal_moves: bool,
}

/// One game of backgammon.
///
/// Single-threaded per instance; callers serialize operations per game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    board: Board,
    cube: DoublingCube,
    mode: GameMode,
    crawford: bool,
    on_roll: Color,
    phase: GamePhase,
    turn: Turn,
    opening: Option<DiceRoll>,
    history: Vec<GameEvent>,
}

/// Opening throws allowed before the dice are judged unable to break a tie.
pub const MAX_OPENING_THROWS: u32 = 64;

impl Game {
    /// Starts a game from the opening position.
    ///
    /// Each side throws one die, re-throwing ties; the higher die moves
    /// first and plays both opening dice as its first roll. Fails with
    /// [`GameError::OpeningUndecided`] when [`MAX_OPENING_THROWS`] throws
    /// in a row all tie.
    #[instrument(skip(dice))]
    pub fn new<D: DiceSource + ?Sized>(
        mode: GameMode,
        crawford: bool,
        dice: &mut D,
    ) -> Result<Self, GameError> {
        let mut decided = None;
        for _ in 0..MAX_OPENING_THROWS {
            let white = dice.roll_die().clamp(1, 6);
            let red = dice.roll_die().clamp(1, 6);
            if white == red {
                debug!(die = white, "Opening tie, re-rolling");
                continue;
            }
            let first = if white > red { Color::White } else { Color::Red };
            // Distinct values in 1-6 always form a valid roll.
            if let Ok(roll) = DiceRoll::new(white, red) {
                decided = Some((first, roll));
                break;
            }
        }
        let Some((first, opening)) = decided else {
            warn!(throws = MAX_OPENING_THROWS, "Opening throws never broke the tie");
            return Err(GameError::OpeningUndecided {
                throws: MAX_OPENING_THROWS,
            });
        };
        info!(%first, %opening, "Opening roll decided");
        Ok(Self {
            board: Board::new(),
            cube: DoublingCube::new(),
            mode,
            crawford,
            on_roll: first,
            phase: GamePhase::AwaitingRoll,
            turn: Turn::new(first),
            opening: Some(opening),
            history: Vec::new(),
        })
    }

    /// Starts a game from an arbitrary position with `on_roll` to roll.
    #[instrument(skip(board))]
    pub fn from_position(
        board: Board,
        on_roll: Color,
        mode: GameMode,
        crawford: bool,
    ) -> Result<Self, GameError> {
        board
            .verify()
            .map_err(|v| GameError::InvariantViolation(v.description))?;
        Ok(Self {
            board,
            cube: DoublingCube::new(),
            mode,
            crawford,
            on_roll,
            phase: GamePhase::AwaitingRoll,
            turn: Turn::new(on_roll),
            opening: None,
            history: Vec::new(),
        })
    }

    /// Replaces the cube, e.g. when resuming a recorded position.
    pub fn with_cube(mut self, cube: DoublingCube) -> Self {
        self.cube = cube;
        self
    }

    /// Moves this game to a recorded position with `on_roll` to roll.
    ///
    /// Mode, Crawford flag and cube carry over; history and any pending
    /// opening roll are dropped.
    #[instrument(skip(self, board))]
    pub fn resume_at(self, board: Board, on_roll: Color) -> Result<Self, GameError> {
        self.ensure_active()?;
        Ok(Self::from_position(board, on_roll, self.mode, self.crawford)?.with_cube(self.cube))
    }

    // ─────────────────────────────────────────────────────────
    //  Queries
    // ─────────────────────────────────────────────────────────

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Doubling cube.
    pub fn cube(&self) -> &DoublingCube {
        &self.cube
    }

    /// Mode policy.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Whether this is the Crawford game of a match.
    pub fn is_crawford(&self) -> bool {
        self.crawford
    }

    /// Color on roll.
    pub fn on_roll(&self) -> Color {
        self.on_roll
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Current turn record.
    pub fn turn(&self) -> &Turn {
        &self.turn
    }

    /// Opening dice waiting to be consumed by the first roll.
    pub fn pending_opening(&self) -> Option<DiceRoll> {
        self.opening
    }

    /// Completed turns and cube events.
    pub fn history(&self) -> &[GameEvent] {
        &self.history
    }

    /// Terminal outcome, if the game is over.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            GamePhase::GameOver(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Whether the game has ended.
    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver(_))
    }

    /// Moves that begin a maximal play with the remaining dice.
    pub fn playable_moves(&self) -> Vec<Move> {
        if self.phase != GamePhase::AwaitingMove {
            return Vec::new();
        }
        MoveGenerator::playable_moves(&self.board, self.on_roll, &self.turn.remaining)
    }

    /// Locations from which a checker can legally move now.
    pub fn valid_sources(&self) -> Vec<Location> {
        let mut sources: Vec<Location> = self.playable_moves().into_iter().map(|m| m.from).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Legal destinations for a checker at `from`.
    pub fn valid_destinations(&self, from: Location) -> Vec<Location> {
        let mut targets: Vec<Location> = self
            .playable_moves()
            .into_iter()
            .filter(|m| m.from == from)
            .map(|m| m.to)
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    /// Every maximal play of the remaining dice.
    pub fn legal_sequences(&self) -> Vec<MoveSequence> {
        if self.phase != GamePhase::AwaitingMove {
            return Vec::new();
        }
        MoveGenerator::sequences(&self.board, self.on_roll, &self.turn.remaining)
    }

    // ─────────────────────────────────────────────────────────
    //  Turn cycle
    // ─────────────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    fn ensure_actor(&self, actor: Color) -> Result<(), GameError> {
        if self.mode.may_act(actor, self.on_roll) {
            Ok(())
        } else {
            warn!(%actor, on_roll = %self.on_roll, "Out-of-turn action rejected");
            Err(GameError::NotYourTurn {
                actor,
                on_roll: self.on_roll,
            })
        }
    }

    fn ensure_can_roll(&self, actor: Color) -> Result<(), GameError> {
        self.ensure_active()?;
        self.ensure_actor(actor)?;
        if self.cube.pending_offer().is_some() {
            return Err(GameError::DoublePending);
        }
        if self.phase != GamePhase::AwaitingRoll {
            return Err(GameError::AlreadyRolled);
        }
        Ok(())
    }

    /// Rolls the dice for the color on roll.
    ///
    /// The first roll of a fresh game returns the opening dice. When no die
    /// can be played the turn passes immediately and `no_legal_moves` is set.
    #[instrument(skip(self, dice), fields(on_roll = %self.on_roll))]
    pub fn roll<D: DiceSource + ?Sized>(
        &mut self,
        actor: Color,
        dice: &mut D,
    ) -> Result<RollOutcome, GameError> {
        self.ensure_can_roll(actor)?;
        let roll = match self.opening.take() {
            Some(opening) => opening,
            None => dice.roll(),
        };
        Ok(self.start_turn(roll))
    }

    /// Sets the dice by hand (analysis mode only).
    #[instrument(skip(self), fields(on_roll = %self.on_roll))]
    pub fn set_dice(&mut self, actor: Color, roll: DiceRoll) -> Result<RollOutcome, GameError> {
        if !self.mode.manual_dice() {
            return Err(GameError::ManualDiceDisabled);
        }
        self.ensure_can_roll(actor)?;
        self.opening = None;
        Ok(self.start_turn(roll))
    }

    fn start_turn(&mut self, roll: DiceRoll) -> RollOutcome {
        self.turn.dice = Some(roll);
        self.turn.remaining = roll.values();
        info!(color = %self.on_roll, dice = %roll, "Dice rolled");
        if MoveGenerator::has_legal_move(&self.board, self.on_roll, &self.turn.remaining) {
            self.phase = GamePhase::AwaitingMove;
            RollOutcome {
                dice: roll,
                no_legal_moves: false,
            }
        } else {
            info!(color = %self.on_roll, "No legal moves, turn passes");
            self.pass_turn();
            RollOutcome {
                dice: roll,
                no_legal_moves: true,
            }
        }
    }

    fn pass_turn(&mut self) {
        let next = self.on_roll.opponent();
        let finished = std::mem::replace(&mut self.turn, Turn::new(next));
        self.history.push(GameEvent::Turn(finished));
        self.on_roll = next;
        self.phase = GamePhase::AwaitingRoll;
    }

    /// Moves a checker from `from` to `to`, choosing the die.
    ///
    /// The smallest remaining die that moves the checker there on a maximal
    /// play is used.
    #[instrument(skip(self), fields(on_roll = %self.on_roll))]
    pub fn apply_move(
        &mut self,
        actor: Color,
        from: Location,
        to: Location,
    ) -> Result<Move, GameError> {
        self.ensure_movable(actor)?;
        let chosen = self
            .playable_moves()
            .into_iter()
            .filter(|m| m.connects(from, to))
            .min_by_key(|m| m.die);
        match chosen {
            Some(mv) => self.commit(mv),
            None => {
                let reason = self.diagnose(from, to);
                warn!(%from, %to, %reason, "Move rejected");
                Err(reason.into())
            }
        }
    }

    /// Plays a fully specified move.
    #[instrument(skip(self), fields(on_roll = %self.on_roll, mv = %mv))]
    pub fn play(&mut self, actor: Color, mv: Move) -> Result<Move, GameError> {
        self.ensure_movable(actor)?;
        if let Err(e) = MoveContract::pre(self, &mv) {
            warn!(error = %e, "Move rejected");
            return Err(e);
        }
        self.commit(mv)
    }

    /// Plays a whole sequence, stopping at the first rejected move.
    pub fn play_sequence(&mut self, actor: Color, moves: &[Move]) -> Result<(), GameError> {
        for mv in moves {
            if self.is_over() {
                break;
            }
            self.play(actor, *mv)?;
        }
        Ok(())
    }

    fn ensure_movable(&self, actor: Color) -> Result<(), GameError> {
        self.ensure_active()?;
        self.ensure_actor(actor)?;
        match self.phase {
            GamePhase::AwaitingRoll if self.cube.pending_offer().is_some() => {
                Err(GameError::DoublePending)
            }
            GamePhase::AwaitingRoll => Err(GameError::NotRolled),
            GamePhase::TurnComplete => Err(IllegalMove::NoDiceRemaining.into()),
            _ => Ok(()),
        }
    }

    /// Explains why `from -> to` is not playable.
    fn diagnose(&self, from: Location, to: Location) -> IllegalMove {
        let color = self.on_roll;
        if self.board.bar(color) > 0 && from != Location::Bar {
            return IllegalMove::BarEntryRequired;
        }
        let mut dice = self.turn.remaining.clone();
        dice.sort_unstable();
        dice.dedup();
        for die in dice {
            if self.board.destination(color, from, die) == Some(to) {
                return match self.board.check_move(color, from, die) {
                    Err(e) => e,
                    Ok(_) => IllegalMove::NotMaximal { from, to },
                };
            }
        }
        if self.board.count_at(color, from) == 0 {
            IllegalMove::NoChecker(from)
        } else {
            IllegalMove::NoDieForMove { from, to }
        }
    }

    /// Applies a validated move to a copy of the game, checks postconditions
    /// in debug builds, then commits it.
    fn commit(&mut self, mv: Move) -> Result<Move, GameError> {
        let color = self.on_roll;
        let resolved = self.board.check_move(color, mv.from, mv.die)?;
        let mut next = self.clone();
        next.board = self.board.apply(color, &resolved)?;
        if let Some(i) = next.turn.remaining.iter().position(|&d| d == mv.die) {
            next.turn.remaining.remove(i);
        }
        next.turn.moves.push(resolved);

        #[cfg(debug_assertions)]
        MoveContract::post(self, &next)?;

        *self = next;
        info!(%color, mv = %resolved, "Move applied");

        if self.board.borne_off(color) == CHECKERS_PER_SIDE {
            let result = GameResult {
                winner: color,
                win_type: WinType::classify(&self.board, color),
                cube_value: self.cube.value(),
            };
            self.finish(Outcome::Won(result));
        } else if self.playable_moves().is_empty() {
            self.phase = GamePhase::TurnComplete;
            debug!(%color, "Turn complete");
        }
        Ok(resolved)
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.turn.rolled() {
            let finished = std::mem::replace(&mut self.turn, Turn::new(self.on_roll));
            self.history.push(GameEvent::Turn(finished));
        }
        self.phase = GamePhase::GameOver(outcome);
        info!(%outcome, "Game over");
    }

    /// Ends the turn once every playable die is used.
    #[instrument(skip(self), fields(on_roll = %self.on_roll))]
    pub fn end_turn(&mut self, actor: Color) -> Result<(), GameError> {
        self.ensure_active()?;
        self.ensure_actor(actor)?;
        match self.phase {
            GamePhase::AwaitingRoll => Err(GameError::NotRolled),
            GamePhase::AwaitingMove => {
                warn!("End of turn requested with moves remaining");
                Err(GameError::MovesRemaining)
            }
            GamePhase::TurnComplete => {
                self.pass_turn();
                Ok(())
            }
            GamePhase::GameOver(_) => Err(GameError::GameOver),
        }
    }

    // ─────────────────────────────────────────────────────────
    //  Cube
    // ─────────────────────────────────────────────────────────

    /// Whether `color` could offer a double right now.
    pub fn can_double(&self, color: Color) -> bool {
        self.check_double(color).is_ok()
    }

    fn check_double(&self, actor: Color) -> Result<(), GameError> {
        self.ensure_active()?;
        if !self.mode.cube_enabled() {
            return Err(CubeError::Disabled.into());
        }
        self.ensure_actor(actor)?;
        if self.phase != GamePhase::AwaitingRoll || self.opening.is_some() {
            return Err(CubeError::AfterRoll.into());
        }
        self.cube.check_offer(actor, self.crawford)?;
        Ok(())
    }

    /// Offers a double before rolling.
    #[instrument(skip(self), fields(on_roll = %self.on_roll))]
    pub fn offer_double(&mut self, actor: Color) -> Result<(), GameError> {
        if let Err(e) = self.check_double(actor) {
            warn!(error = %e, "Double rejected");
            return Err(e);
        }
        self.cube.offer(actor, self.crawford)?;
        self.history.push(GameEvent::DoubleOffered(actor));
        Ok(())
    }

    /// Takes the pending double.
    #[instrument(skip(self))]
    pub fn accept_double(&mut self, actor: Color) -> Result<u32, GameError> {
        self.ensure_active()?;
        if self.cube.pending_offer().is_none() {
            return Err(GameError::NoPendingDouble);
        }
        let value = self.cube.accept(actor).map_err(GameError::CannotRespond)?;
        self.history.push(GameEvent::DoubleAccepted { by: actor, value });
        Ok(value)
    }

    /// Passes the pending double, conceding a normal win at the current stakes.
    #[instrument(skip(self))]
    pub fn decline_double(&mut self, actor: Color) -> Result<Outcome, GameError> {
        self.ensure_active()?;
        let Some(offerer) = self.cube.pending_offer() else {
            return Err(GameError::NoPendingDouble);
        };
        let stakes = self.cube.decline(actor).map_err(GameError::CannotRespond)?;
        self.history.push(GameEvent::DoubleDeclined(actor));
        let outcome = Outcome::Won(GameResult {
            winner: offerer,
            win_type: WinType::Normal,
            cube_value: stakes,
        });
        self.finish(outcome);
        Ok(outcome)
    }

    /// Ends the game without crediting a winner.
    #[instrument(skip(self))]
    pub fn abandon(&mut self) -> Result<(), GameError> {
        self.ensure_active()?;
        self.history.push(GameEvent::Abandoned);
        self.finish(Outcome::Abandoned);
        Ok(())
    }
}
