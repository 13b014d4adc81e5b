//! First-class move types for backgammon.
//!
//! A move is a single checker traveling one die's worth of pips. Moves are
//! validated against a specific board, color and die value; they can be
//! logged, replayed and compared before they touch any state.

use crate::cube::CubeError;
use crate::types::{Color, Location};
use serde::{Deserialize, Serialize};

/// A single checker move.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Move {
    /// Where the checker starts.
    pub from: Location,
    /// Where the checker lands.
    pub to: Location,
    /// Die value consumed by this move.
    pub die: u8,
    /// Whether the move hits an opposing blot.
    pub hit: bool,
}

impl Move {
    /// Creates a new move.
    pub fn new(from: Location, to: Location, die: u8, hit: bool) -> Self {
        Self { from, to, die, hit }
    }

    /// Returns whether this move lands on the same route as `(from, to)`.
    pub fn connects(&self, from: Location, to: Location) -> bool {
        self.from == from && self.to == to
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.from, self.to)?;
        if self.hit {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// Reasons a move is illegal.
///
/// Always locally detectable, surfaced verbatim, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum IllegalMove {
    /// No checker of the moving color at the source.
    #[display("No checker to move from {}", _0)]
    NoChecker(Location),

    /// A checker on the bar must enter before any other checker moves.
    #[display("Checker on the bar must enter first")]
    BarEntryRequired,

    /// The destination holds two or more opposing checkers.
    #[display("Point {} is blocked", _0)]
    Blocked(u8),

    /// Bearing off while checkers remain outside the home board.
    #[display("Cannot bear off with checkers outside the home board")]
    BearOffNotAllowed,

    /// Bearing off with a larger die while a checker sits further back.
    #[display("Must move the checker on point {} before bearing off from {}", blocker, from)]
    OvershootNotAllowed {
        /// Source point of the attempted bear-off.
        from: u8,
        /// Point holding the checker that must move first.
        blocker: u8,
    },

    /// Die value outside 1-6.
    #[display("Invalid die value {}", _0)]
    InvalidDie(u8),

    /// The die value is not among the dice remaining this turn.
    #[display("Die {} is not available", _0)]
    DieNotAvailable(u8),

    /// The destination does not match the die.
    #[display("{} does not reach {} with die {}", from, to, die)]
    WrongDestination {
        /// Source.
        from: Location,
        /// Requested destination.
        to: Location,
        /// Die value tried.
        die: u8,
    },

    /// No remaining die carries a checker from `from` to `to`.
    #[display("No remaining die moves {} to {}", from, to)]
    NoDieForMove {
        /// Source.
        from: Location,
        /// Requested destination.
        to: Location,
    },

    /// Legal on the board, but playing it would use fewer dice than required.
    #[display("Move {}/{} does not allow the maximum number of dice to be played", from, to)]
    NotMaximal {
        /// Source.
        from: Location,
        /// Destination.
        to: Location,
    },

    /// Every die has been played this turn.
    #[display("No dice remain this turn")]
    NoDiceRemaining,
}

impl std::error::Error for IllegalMove {}

/// Errors from driving the game state machine.
///
/// Protocol-sequencing errors are surfaced to the caller and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum GameError {
    /// The move is not legal for the current board and remaining dice.
    #[display("Invalid move: {}", _0)]
    InvalidMove(IllegalMove),

    /// The acting color is not allowed to act now.
    #[display("{} cannot act while {} is on roll", actor, on_roll)]
    NotYourTurn {
        /// Color that tried to act.
        actor: Color,
        /// Color on roll.
        on_roll: Color,
    },

    /// Dice were already rolled this turn.
    #[display("Dice have already been rolled this turn")]
    AlreadyRolled,

    /// The action needs dice that have not been rolled yet.
    #[display("Dice have not been rolled yet")]
    NotRolled,

    /// A legal move is still available.
    #[display("Legal moves remain; the turn cannot end yet")]
    MovesRemaining,

    /// The cube action was rejected.
    #[display("Cannot double: {}", _0)]
    CannotDouble(CubeError),

    /// The response to a pending double was rejected.
    #[display("Cannot respond to double: {}", _0)]
    CannotRespond(CubeError),

    /// Accept or decline with no double on the table.
    #[display("No double is pending")]
    NoPendingDouble,

    /// Rolling or moving while a double awaits a response.
    #[display("A double is pending a response")]
    DoublePending,

    /// Dice may only be set by hand in analysis mode.
    #[display("Manual dice are not allowed in this game mode")]
    ManualDiceDisabled,

    /// The game has already ended.
    #[display("Game is already over")]
    GameOver,

    /// Every opening throw tied.
    #[display("Opening throws tied {} times in a row", throws)]
    OpeningUndecided {
        /// Throws made before giving up.
        throws: u32,
    },

    /// A core invariant failed (postcondition failure). Not recoverable.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for GameError {}

impl From<IllegalMove> for GameError {
    fn from(e: IllegalMove) -> Self {
        GameError::InvalidMove(e)
    }
}

impl From<CubeError> for GameError {
    fn from(e: CubeError) -> Self {
        GameError::CannotDouble(e)
    }
}
