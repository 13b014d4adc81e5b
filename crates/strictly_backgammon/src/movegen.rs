//! Legal move generation under dice constraints.
//!
//! A play must use as many dice as any legal play allows. When only one of
//! two different dice can be used, the larger one must be played if it can
//! be. The generator enumerates plays depth-first over die orderings,
//! following only moves that keep the maximum reachable, and deduplicates
//! plays by the board they produce.

use crate::action::Move;
use crate::board::Board;
use crate::types::{Color, Location, POINTS};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// A complete legal play for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveSequence {
    moves: Vec<Move>,
    result: Board,
    pips: u32,
}

impl MoveSequence {
    /// The moves in playing order.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Board after the whole play.
    pub fn result(&self) -> &Board {
        &self.result
    }

    /// Number of dice used.
    pub fn dice_used(&self) -> usize {
        self.moves.len()
    }

    /// Total pips travelled by the moved checkers.
    pub fn pips_moved(&self) -> u32 {
        self.pips
    }

    /// Consumes the sequence, returning its moves.
    pub fn into_moves(self) -> Vec<Move> {
        self.moves
    }
}

impl std::fmt::Display for MoveSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.moves.iter().map(|m| m.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Stateless entry point for move generation.
///
/// Every call builds its own memo table, so the generator may run on any
/// thread without coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    /// All single moves legal on the board for any one of `dice`,
    /// ignoring whether the rest of the dice can still be used.
    #[instrument(skip(board))]
    pub fn single_moves(board: &Board, color: Color, dice: &[u8]) -> Vec<Move> {
        single_moves(board, color, dice)
    }

    /// The largest number of dice any legal play can use.
    #[instrument(skip(board))]
    pub fn max_dice_usable(board: &Board, color: Color, dice: &[u8]) -> usize {
        Search::new(color).max_depth(board, dice)
    }

    /// Moves that begin some maximal legal play.
    #[instrument(skip(board))]
    pub fn playable_moves(board: &Board, color: Color, dice: &[u8]) -> Vec<Move> {
        Search::new(color).playable(board, dice)
    }

    /// Whether at least one die can be played.
    pub fn has_legal_move(board: &Board, color: Color, dice: &[u8]) -> bool {
        !single_moves(board, color, dice).is_empty()
    }

    /// Every maximal legal play, one per distinct resulting board.
    ///
    /// Returns an empty list when no die can be played.
    #[instrument(skip(board))]
    pub fn sequences(board: &Board, color: Color, dice: &[u8]) -> Vec<MoveSequence> {
        let mut search = Search::new(color);
        let mut walk = Walk::default();
        let mut prefix = Vec::new();
        search.walk(board, &sorted(dice), &mut prefix, &mut walk);
        debug!(count = walk.sequences.len(), "Generated maximal sequences");
        walk.sequences
    }
}

/// Sources in a fixed order: bar first, then points from farthest to nearest.
fn sources(board: &Board, color: Color) -> Vec<Location> {
    if board.bar(color) > 0 {
        return vec![Location::Bar];
    }
    (1..=POINTS)
        .rev()
        .map(|d| color.point_at(d))
        .filter(|&p| board.checkers_at(color, p) > 0)
        .map(Location::Point)
        .collect()
}

fn distinct_dice(dice: &[u8]) -> Vec<u8> {
    let mut values: Vec<u8> = dice.to_vec();
    values.sort_unstable_by(|a, b| b.cmp(a));
    values.dedup();
    values
}

fn sorted(dice: &[u8]) -> Vec<u8> {
    let mut values = dice.to_vec();
    values.sort_unstable_by(|a, b| b.cmp(a));
    values
}

fn without(dice: &[u8], die: u8) -> Vec<u8> {
    let mut rest = dice.to_vec();
    if let Some(i) = rest.iter().position(|&d| d == die) {
        rest.remove(i);
    }
    rest
}

fn single_moves(board: &Board, color: Color, dice: &[u8]) -> Vec<Move> {
    let mut moves = Vec::new();
    for from in sources(board, color) {
        for die in distinct_dice(dice) {
            if let Ok(mv) = board.check_move(color, from, die) {
                moves.push(mv);
            }
        }
    }
    moves
}

/// Accumulates distinct plays during the depth-first walk.
#[derive(Default)]
struct Walk {
    visited: HashSet<(Board, Vec<u8>)>,
    results: HashSet<Board>,
    sequences: Vec<MoveSequence>,
}

/// Depth-first search state with a memo of maximum reachable depths.
struct Search {
    color: Color,
    memo: HashMap<(Board, Vec<u8>), usize>,
}

impl Search {
    fn new(color: Color) -> Self {
        Self {
            color,
            memo: HashMap::new(),
        }
    }

    fn max_depth(&mut self, board: &Board, dice: &[u8]) -> usize {
        if dice.is_empty() {
            return 0;
        }
        let key = (*board, sorted(dice));
        if let Some(&depth) = self.memo.get(&key) {
            return depth;
        }
        let mut best = 0;
        for mv in single_moves(board, self.color, dice) {
            let Ok(next) = board.apply(self.color, &mv) else {
                continue;
            };
            best = best.max(1 + self.max_depth(&next, &without(dice, mv.die)));
            if best == dice.len() {
                break;
            }
        }
        self.memo.insert(key, best);
        best
    }

    fn playable(&mut self, board: &Board, dice: &[u8]) -> Vec<Move> {
        let total = self.max_depth(board, dice);
        if total == 0 {
            return Vec::new();
        }
        let mut moves: Vec<Move> = single_moves(board, self.color, dice)
            .into_iter()
            .filter(|mv| match board.apply(self.color, mv) {
                Ok(next) => 1 + self.max_depth(&next, &without(dice, mv.die)) == total,
                Err(_) => false,
            })
            .collect();

        // Only one of two different dice can be played: the larger one wins.
        if total == 1 && dice.len() == 2 && dice[0] != dice[1] {
            let high = dice[0].max(dice[1]);
            if moves.iter().any(|mv| mv.die == high) {
                moves.retain(|mv| mv.die == high);
            }
        }
        moves
    }

    fn walk(&mut self, board: &Board, dice: &[u8], prefix: &mut Vec<Move>, walk: &mut Walk) {
        let moves = self.playable(board, dice);
        if moves.is_empty() {
            if !prefix.is_empty() && walk.results.insert(*board) {
                let pips = prefix
                    .iter()
                    .map(|mv| (mv.from.distance(self.color) - mv.to.distance(self.color)) as u32)
                    .sum();
                walk.sequences.push(MoveSequence {
                    moves: prefix.clone(),
                    result: *board,
                    pips,
                });
            }
            return;
        }
        for mv in moves {
            let Ok(next) = board.apply(self.color, &mv) else {
                continue;
            };
            let rest = without(dice, mv.die);
            if !walk.visited.insert((next, rest.clone())) {
                continue;
            }
            prefix.push(mv);
            self.walk(&next, &rest, prefix, walk);
            prefix.pop();
        }
    }
}
