//! Core domain types for backgammon.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of checkers each color owns.
pub const CHECKERS_PER_SIDE: u8 = 15;

/// Number of points on the board.
pub const POINTS: u8 = 24;

/// Pip distance of a checker on the bar.
pub const BAR_DISTANCE: u8 = 25;

/// Checker color.
///
/// White travels from point 24 down to point 1 and bears off past point 1.
/// Red travels from point 1 up to point 24 and bears off past point 24.
/// White is player 1 in a match, Red is player 2.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Color {
    /// Player 1, home board on points 1-6.
    White,
    /// Player 2, home board on points 19-24.
    Red,
}

impl Color {
    /// Returns the opposing color.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Red,
            Color::Red => Color::White,
        }
    }

    /// Index into per-color arrays (White = 0, Red = 1).
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Red => 1,
        }
    }

    /// Pip distance from `point` to bearing off, as seen by this color.
    ///
    /// This is also the point number in the mover's own numbering.
    pub fn distance(self, point: u8) -> u8 {
        match self {
            Color::White => point,
            Color::Red => BAR_DISTANCE - point,
        }
    }

    /// Absolute point that lies `distance` pips from bearing off.
    pub fn point_at(self, distance: u8) -> u8 {
        match self {
            Color::White => distance,
            Color::Red => BAR_DISTANCE - distance,
        }
    }

    /// Whether `point` lies in this color's home board.
    pub fn is_home(self, point: u8) -> bool {
        (1..=6).contains(&self.distance(point))
    }

    /// Numeric index this color uses for the bar in `(from, to)` pairs.
    pub fn bar_index(self) -> u8 {
        match self {
            Color::White => 25,
            Color::Red => 0,
        }
    }

    /// Numeric index this color uses for bearing off in `(from, to)` pairs.
    pub fn off_index(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Red => 25,
        }
    }
}

/// Where a checker sits or travels to.
///
/// Ordering (`Bar < Point < Off`) is used to break ties deterministically
/// when ranking plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Location {
    /// The color's bar slot.
    Bar,
    /// An absolute point, 1-24.
    Point(u8),
    /// Borne off.
    Off,
}

impl Location {
    /// Resolves a numeric `(from, to)` index for `color`.
    ///
    /// Points are 1-24; the color's bar and off indices come from
    /// [`Color::bar_index`] and [`Color::off_index`].
    #[instrument]
    pub fn from_index(color: Color, index: u8) -> Option<Self> {
        if index == color.bar_index() {
            Some(Location::Bar)
        } else if index == color.off_index() {
            Some(Location::Off)
        } else if (1..=POINTS).contains(&index) {
            Some(Location::Point(index))
        } else {
            None
        }
    }

    /// Converts back to the numeric index used by clients.
    pub fn to_index(self, color: Color) -> u8 {
        match self {
            Location::Bar => color.bar_index(),
            Location::Point(p) => p,
            Location::Off => color.off_index(),
        }
    }

    /// Pip distance from this location to bearing off for `color`.
    pub fn distance(self, color: Color) -> u8 {
        match self {
            Location::Bar => BAR_DISTANCE,
            Location::Point(p) => color.distance(p),
            Location::Off => 0,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Bar => write!(f, "bar"),
            Location::Point(p) => write!(f, "{}", p),
            Location::Off => write!(f, "off"),
        }
    }
}

/// A point on the board.
///
/// A point is either empty or holds checkers of exactly one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Point {
    /// No checkers.
    Empty,
    /// One or more checkers of a single color.
    Occupied(Color, u8),
}

impl Point {
    /// Number of checkers of `color` on this point.
    pub fn count_for(self, color: Color) -> u8 {
        match self {
            Point::Occupied(c, n) if c == color => n,
            _ => 0,
        }
    }

    /// The owning color, if any.
    pub fn owner(self) -> Option<Color> {
        match self {
            Point::Occupied(c, _) => Some(c),
            Point::Empty => None,
        }
    }

    /// Whether this point holds two or more checkers of `color`.
    pub fn is_made_by(self, color: Color) -> bool {
        self.count_for(color) >= 2
    }

    /// Whether `color` is blocked from landing here.
    pub fn blocks(self, color: Color) -> bool {
        matches!(self, Point::Occupied(c, n) if c != color && n >= 2)
    }
}
