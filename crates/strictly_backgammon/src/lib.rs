//! Strictly Backgammon - a pure backgammon rules engine.
//!
//! # Architecture
//!
//! - **Board**: points, bar and borne-off trays with checker conservation
//! - **MoveGenerator**: every maximal legal play for a roll
//! - **Game**: the roll / move / end-turn state machine with the doubling cube
//! - **Match**: scoring with win-type multipliers and the Crawford rule
//! - **Evaluators and bots**: a cancellable evaluator contract, a heuristic
//!   evaluator, and random, greedy and evaluator-backed bots
//!
//! The crate performs no I/O. Games and matches are single-threaded values;
//! callers serialize operations per instance.
//!
//! # Example
//!
//! ```
//! use strictly_backgammon::{Color, FixedDice, Game, GameMode, Location};
//!
//! let mut dice = FixedDice::opening(3, 1, &[]);
//! let mut game = Game::new(GameMode::Standard, false, &mut dice).unwrap();
//! game.roll(Color::White, &mut dice).unwrap();
//! game.apply_move(Color::White, Location::Point(8), Location::Point(5)).unwrap();
//! game.apply_move(Color::White, Location::Point(6), Location::Point(5)).unwrap();
//! game.end_turn(Color::White).unwrap();
//! assert_eq!(game.on_roll(), Color::Red);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod board;
pub mod bots;
mod contracts;
mod cube;
mod dice;
pub mod eval;
mod game;
pub mod invariants;
mod match_play;
mod mode;
mod movegen;
pub mod notation;
mod outcome;
pub mod position_id;
mod registry;
mod types;

pub use action::{GameError, IllegalMove, Move};
pub use board::Board;
pub use bots::{Bot, BotError, EvaluatorBackedBot, FallbackPolicy, GreedyBot, RandomBot};
pub use contracts::{Contract, MoveContract};
pub use cube::{CubeError, CubeState, DoublingCube};
pub use dice::{DiceRoll, DiceSource, FixedDice, InvalidDie, RandomDice};
pub use eval::{
    BestMovesAnalysis, CubeDecision, CubeRecommendation, CubeThresholds, Evaluator, EvaluatorError,
    HeuristicEvaluator, PositionEvaluation, PositionFeatures, RankedPlay,
};
pub use game::{Game, GameEvent, GamePhase, MAX_OPENING_THROWS, RollOutcome, Turn};
pub use invariants::{Invariant, InvariantSet, InvariantViolation};
pub use match_play::{GameId, GameRecord, Match, MatchContext, MatchError, MatchStatus, OpponentKind};
pub use mode::GameMode;
pub use movegen::{MoveGenerator, MoveSequence};
pub use notation::NotationError;
pub use outcome::{GameResult, Outcome, WinType};
pub use position_id::PositionIdError;
pub use registry::{
    BotRegistry, EvaluatorRegistry, Factory, PluginInfo, PluginOptions, Registry, RegistryError,
};
pub use types::{BAR_DISTANCE, CHECKERS_PER_SIDE, Color, Location, POINTS, Point};
