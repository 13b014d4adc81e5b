//! Board representation: 24 points, two bar slots, two borne-off trays.

use crate::action::{IllegalMove, Move};
use crate::invariants::InvariantViolation;
use crate::types::{BAR_DISTANCE, CHECKERS_PER_SIDE, Color, Location, POINTS, Point};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Backgammon board.
///
/// Invariant: for each color, checkers on points + bar + borne off == 15.
/// The board is a small `Copy` value; [`Board::apply`] returns a new board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Points 1-24, stored at index `point - 1`.
    points: [Point; POINTS as usize],
    /// Checkers on the bar, indexed by [`Color::index`].
    bar: [u8; 2],
    /// Checkers borne off, indexed by [`Color::index`].
    off: [u8; 2],
}

/// Standard starting layout for White (absolute points); Red mirrors it.
const OPENING_LAYOUT: [(u8, u8); 4] = [(24, 2), (13, 5), (8, 3), (6, 5)];

impl Board {
    /// Creates the standard starting position.
    #[instrument]
    pub fn new() -> Self {
        let mut board = Self::empty();
        for (point, count) in OPENING_LAYOUT {
            board.points[(point - 1) as usize] = Point::Occupied(Color::White, count);
            let mirrored = Color::Red.point_at(point);
            board.points[(mirrored - 1) as usize] = Point::Occupied(Color::Red, count);
        }
        board
    }

    /// A board with every checker already borne off.
    pub fn empty() -> Self {
        Self {
            points: [Point::Empty; POINTS as usize],
            bar: [0; 2],
            off: [CHECKERS_PER_SIDE; 2],
        }
    }

    /// Builds a board from explicit checker placements.
    ///
    /// Each entry is `(location, count)` for that color; checkers not
    /// placed are counted as borne off. Placing more than 15 checkers,
    /// placing on `Off`, or sharing a point between colors is rejected.
    #[instrument]
    pub fn from_layout(
        white: &[(Location, u8)],
        red: &[(Location, u8)],
    ) -> Result<Self, InvariantViolation> {
        let mut board = Self::empty();
        for (color, layout) in [(Color::White, white), (Color::Red, red)] {
            let mut placed: u16 = 0;
            for &(location, count) in layout {
                if count == 0 {
                    continue;
                }
                placed += count as u16;
                if placed > CHECKERS_PER_SIDE as u16 {
                    return Err(InvariantViolation::new(format!(
                        "{} has more than {} checkers on the board",
                        color, CHECKERS_PER_SIDE
                    )));
                }
                match location {
                    Location::Bar => board.bar[color.index()] += count,
                    Location::Off => {
                        return Err(InvariantViolation::new(
                            "Borne-off checkers are implied, not placed",
                        ));
                    }
                    Location::Point(p) if (1..=POINTS).contains(&p) => {
                        let slot = &mut board.points[(p - 1) as usize];
                        *slot = match *slot {
                            Point::Empty => Point::Occupied(color, count),
                            Point::Occupied(c, n) if c == color => Point::Occupied(color, n + count),
                            Point::Occupied(_, _) => {
                                return Err(InvariantViolation::new(format!(
                                    "Point {} holds checkers of both colors",
                                    p
                                )));
                            }
                        };
                    }
                    Location::Point(p) => {
                        return Err(InvariantViolation::new(format!("Point {} is off the board", p)));
                    }
                }
            }
            board.off[color.index()] = CHECKERS_PER_SIDE - placed as u8;
        }
        board.verify()?;
        Ok(board)
    }

    /// Returns the point at `point` (1-24).
    pub fn point(&self, point: u8) -> Point {
        self.points
            .get(point.wrapping_sub(1) as usize)
            .copied()
            .unwrap_or(Point::Empty)
    }

    /// All 24 points, index `point - 1`.
    pub fn points(&self) -> &[Point; POINTS as usize] {
        &self.points
    }

    /// Checkers of `color` on `point`.
    pub fn checkers_at(&self, color: Color, point: u8) -> u8 {
        self.point(point).count_for(color)
    }

    /// Checkers of `color` at any location.
    pub fn count_at(&self, color: Color, location: Location) -> u8 {
        match location {
            Location::Bar => self.bar(color),
            Location::Point(p) => self.checkers_at(color, p),
            Location::Off => self.borne_off(color),
        }
    }

    /// Checkers of `color` on the bar.
    pub fn bar(&self, color: Color) -> u8 {
        self.bar[color.index()]
    }

    /// Checkers of `color` borne off.
    pub fn borne_off(&self, color: Color) -> u8 {
        self.off[color.index()]
    }

    /// Sum of each checker's distance to bearing off.
    #[instrument(skip(self))]
    pub fn pip_count(&self, color: Color) -> u32 {
        let on_points: u32 = (1..=POINTS)
            .map(|p| self.checkers_at(color, p) as u32 * color.distance(p) as u32)
            .sum();
        on_points + self.bar(color) as u32 * BAR_DISTANCE as u32
    }

    /// Whether every remaining checker of `color` is in its home board.
    pub fn all_home(&self, color: Color) -> bool {
        self.bar(color) == 0
            && (1..=POINTS)
                .filter(|&p| !color.is_home(p))
                .all(|p| self.checkers_at(color, p) == 0)
    }

    /// Greatest distance at which `color` has a checker (25 when on the bar).
    pub fn rearmost_distance(&self, color: Color) -> Option<u8> {
        if self.bar(color) > 0 {
            return Some(BAR_DISTANCE);
        }
        (1..=POINTS)
            .map(|d| (d, color.point_at(d)))
            .filter(|&(_, p)| self.checkers_at(color, p) > 0)
            .map(|(d, _)| d)
            .max()
    }

    /// Number of pips over which the two rear guards still overlap.
    ///
    /// Zero once the sides have passed each other.
    pub fn contact_overlap(&self) -> u8 {
        match (
            self.rearmost_distance(Color::White),
            self.rearmost_distance(Color::Red),
        ) {
            // White's rearmost point `w` lies above Red's rearmost point `25 - r`.
            (Some(w), Some(r)) => (w + r).saturating_sub(BAR_DISTANCE),
            _ => 0,
        }
    }

    /// Whether the two sides can still hit each other.
    pub fn has_contact(&self) -> bool {
        self.contact_overlap() > 0
    }

    /// Total checkers of `color` on points, bar and borne off.
    pub fn checker_total(&self, color: Color) -> u16 {
        let on_points: u16 = (1..=POINTS).map(|p| self.checkers_at(color, p) as u16).sum();
        on_points + self.bar(color) as u16 + self.borne_off(color) as u16
    }

    /// Verifies checker conservation and point exclusivity.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        for color in [Color::White, Color::Red] {
            let total = self.checker_total(color);
            if total != CHECKERS_PER_SIDE as u16 {
                return Err(InvariantViolation::new(format!(
                    "{} has {} checkers instead of {}",
                    color, total, CHECKERS_PER_SIDE
                )));
            }
        }
        if let Some(p) = self
            .points
            .iter()
            .position(|pt| matches!(pt, Point::Occupied(_, 0)))
        {
            return Err(InvariantViolation::new(format!(
                "Point {} is occupied by zero checkers",
                p + 1
            )));
        }
        Ok(())
    }

    /// Where a checker of `color` at `from` lands with `die`, ignoring legality.
    pub fn destination(&self, color: Color, from: Location, die: u8) -> Option<Location> {
        if !(1..=6).contains(&die) || from == Location::Off {
            return None;
        }
        let start = from.distance(color);
        if start > die {
            Some(Location::Point(color.point_at(start - die)))
        } else {
            Some(Location::Off)
        }
    }

    /// Checks a single move of `color` from `from` using `die`.
    ///
    /// Returns the fully resolved move (destination and hit flag) or the
    /// reason it is illegal.
    pub fn check_move(&self, color: Color, from: Location, die: u8) -> Result<Move, IllegalMove> {
        if !(1..=6).contains(&die) {
            return Err(IllegalMove::InvalidDie(die));
        }
        if self.bar(color) > 0 && from != Location::Bar {
            return Err(IllegalMove::BarEntryRequired);
        }
        if self.count_at(color, from) == 0 || from == Location::Off {
            return Err(IllegalMove::NoChecker(from));
        }

        let start = from.distance(color);
        if start > die {
            let target = color.point_at(start - die);
            let point = self.point(target);
            if point.blocks(color) {
                return Err(IllegalMove::Blocked(target));
            }
            let hit = matches!(point, Point::Occupied(c, 1) if c != color);
            return Ok(Move::new(from, Location::Point(target), die, hit));
        }

        if !self.all_home(color) {
            return Err(IllegalMove::BearOffNotAllowed);
        }
        if start < die {
            // Overshooting is only allowed from the rearmost occupied point.
            if let Some(rear) = self.rearmost_distance(color)
                && rear > start
            {
                return Err(IllegalMove::OvershootNotAllowed {
                    from: color.point_at(start),
                    blocker: color.point_at(rear),
                });
            }
        }
        Ok(Move::new(from, Location::Off, die, false))
    }

    /// Applies `mv` for `color`, returning the resulting board.
    ///
    /// The hit flag on `mv` is ignored; hits are determined by the board and
    /// an opposing blot is sent to its bar as part of the move.
    #[instrument(skip(self), fields(color = %color, mv = %mv))]
    pub fn apply(&self, color: Color, mv: &Move) -> Result<Board, IllegalMove> {
        let resolved = self.check_move(color, mv.from, mv.die)?;
        if resolved.to != mv.to {
            warn!(expected = %resolved.to, "Move destination does not match die");
            return Err(IllegalMove::WrongDestination {
                from: mv.from,
                to: mv.to,
                die: mv.die,
            });
        }
        let mut next = *self;
        next.transfer(color, resolved.from, resolved.to);
        debug_assert!(next.verify().is_ok(), "checker conservation violated by apply");
        Ok(next)
    }

    /// Moves one checker of `color` without checking legality, hitting a
    /// lone opposing checker at the destination.
    ///
    /// The caller guarantees a checker exists at `from`.
    pub(crate) fn transfer(&mut self, color: Color, from: Location, to: Location) -> bool {
        match from {
            Location::Bar => self.bar[color.index()] -= 1,
            Location::Point(p) => self.remove_from_point(color, p),
            Location::Off => self.off[color.index()] -= 1,
        }
        match to {
            Location::Bar => {
                self.bar[color.index()] += 1;
                false
            }
            Location::Off => {
                self.off[color.index()] += 1;
                false
            }
            Location::Point(p) => {
                let slot = &mut self.points[(p - 1) as usize];
                let (next, hit) = match *slot {
                    Point::Empty => (Point::Occupied(color, 1), false),
                    Point::Occupied(c, n) if c == color => (Point::Occupied(color, n + 1), false),
                    Point::Occupied(_, _) => (Point::Occupied(color, 1), true),
                };
                *slot = next;
                if hit {
                    self.bar[color.opponent().index()] += 1;
                }
                hit
            }
        }
    }

    fn remove_from_point(&mut self, color: Color, point: u8) {
        let slot = &mut self.points[(point - 1) as usize];
        *slot = match *slot {
            Point::Occupied(c, n) if c == color && n > 1 => Point::Occupied(color, n - 1),
            _ => Point::Empty,
        };
    }

    /// Formats the board as a human-readable diagram (top: 13-24, bottom: 12-1).
    pub fn display(&self) -> String {
        let cell = |p: u8| match self.point(p) {
            Point::Empty => " . ".to_string(),
            Point::Occupied(Color::White, n) => format!("W{:<2}", n),
            Point::Occupied(Color::Red, n) => format!("R{:<2}", n),
        };
        let mut out = String::new();
        out.push_str(&(13..=24).map(|p| format!("{:<3}", p)).collect::<Vec<_>>().join(" "));
        out.push('\n');
        out.push_str(&(13..=24).map(cell).collect::<Vec<_>>().join(" "));
        out.push('\n');
        out.push_str(&(1..=12).rev().map(cell).collect::<Vec<_>>().join(" "));
        out.push('\n');
        out.push_str(&(1..=12).rev().map(|p| format!("{:<3}", p)).collect::<Vec<_>>().join(" "));
        out.push_str(&format!(
            "\nbar W{} R{}  off W{} R{}",
            self.bar(Color::White),
            self.bar(Color::Red),
            self.borne_off(Color::White),
            self.borne_off(Color::Red)
        ));
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
