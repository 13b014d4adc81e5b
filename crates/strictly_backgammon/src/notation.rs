//! gnubg-style move notation.
//!
//! Points are numbered from the mover's point of view (24 is the mover's
//! back point, 1 its last home point): `8/5 6/5`, `bar/22`, `6/off`,
//! `24/23*`, `13/10(2)`, and chains such as `24/18/13`.

use crate::action::Move;
use crate::board::Board;
use crate::movegen::{MoveGenerator, MoveSequence};
use crate::types::{Color, Location, POINTS};
use tracing::{debug, instrument, warn};

/// Errors parsing or resolving notation.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum NotationError {
    /// Nothing to parse.
    #[display("Empty move notation")]
    Empty,
    /// A token is not of the form `from/to`.
    #[display("Malformed move '{}'", _0)]
    Malformed(String),
    /// A point is not `bar`, `off` or 1-24.
    #[display("Invalid point '{}'", _0)]
    InvalidPoint(String),
    /// The play moves a checker that is not there.
    #[display("No checker on {}", _0)]
    NoChecker(Location),
    /// The resulting board matches no legal play.
    #[display("'{}' is not a legal play", _0)]
    NotLegal(String),
}

impl std::error::Error for NotationError {}

/// One checker hop in mover-relative numbering.
///
/// `0` is off and `25` is the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Start, 1-25.
    pub from: u8,
    /// End, 0-24.
    pub to: u8,
}

impl Segment {
    /// Converts to absolute locations for `color`.
    pub fn locations(&self, color: Color) -> (Location, Location) {
        (relative_location(color, self.from), relative_location(color, self.to))
    }
}

fn relative_location(color: Color, relative: u8) -> Location {
    match relative {
        0 => Location::Off,
        25 => Location::Bar,
        p => Location::Point(color.point_at(p)),
    }
}

fn relative_index(color: Color, location: Location) -> u8 {
    match location {
        Location::Off => 0,
        Location::Bar => 25,
        Location::Point(p) => color.distance(p),
    }
}

fn parse_point(text: &str) -> Result<u8, NotationError> {
    let trimmed = text.trim_end_matches('*');
    match trimmed.to_ascii_lowercase().as_str() {
        "bar" | "b" => Ok(25),
        "off" | "o" => Ok(0),
        digits => match digits.parse::<u8>() {
            Ok(p) if (1..=POINTS).contains(&p) => Ok(p),
            _ => Err(NotationError::InvalidPoint(text.to_string())),
        },
    }
}

/// Parses notation into hops, expanding chains and `(n)` repeats.
#[instrument]
pub fn parse(text: &str) -> Result<Vec<Segment>, NotationError> {
    let mut segments = Vec::new();
    for token in text.split_whitespace() {
        let (body, repeat) = match token.split_once('(') {
            Some((body, rest)) => {
                let count = rest
                    .trim_end_matches(')')
                    .parse::<usize>()
                    .map_err(|_| NotationError::Malformed(token.to_string()))?;
                (body, count)
            }
            None => (token, 1),
        };
        let points = body
            .split('/')
            .map(parse_point)
            .collect::<Result<Vec<u8>, _>>()?;
        if points.len() < 2 || repeat == 0 {
            return Err(NotationError::Malformed(token.to_string()));
        }
        for _ in 0..repeat {
            for pair in points.windows(2) {
                if pair[1] >= pair[0] {
                    return Err(NotationError::Malformed(token.to_string()));
                }
                segments.push(Segment {
                    from: pair[0],
                    to: pair[1],
                });
            }
        }
    }
    if segments.is_empty() {
        return Err(NotationError::Empty);
    }
    Ok(segments)
}

/// Identifies the legal play that `text` describes.
///
/// The hops are applied to a scratch board and the play is matched against
/// the generator's output by resulting board, so combined hops such as
/// `13/8` for a 3-2 resolve to the two-move play.
#[instrument(skip(board))]
pub fn resolve(
    board: &Board,
    color: Color,
    dice: &[u8],
    text: &str,
) -> Result<MoveSequence, NotationError> {
    let mut target = *board;
    for segment in parse(text)? {
        let (from, to) = segment.locations(color);
        if target.count_at(color, from) == 0 {
            return Err(NotationError::NoChecker(from));
        }
        target.transfer(color, from, to);
    }
    let found = MoveGenerator::sequences(board, color, dice)
        .into_iter()
        .find(|seq| *seq.result() == target);
    match found {
        Some(seq) => {
            debug!(play = %seq, "Resolved notation");
            Ok(seq)
        }
        None => {
            warn!(text, "Notation matches no legal play");
            Err(NotationError::NotLegal(text.to_string()))
        }
    }
}

/// Formats moves in mover-relative notation, grouping repeats as `(n)`.
pub fn format(color: Color, moves: &[Move]) -> String {
    let mut groups: Vec<(Move, usize)> = Vec::new();
    for mv in moves {
        match groups.iter_mut().find(|(m, _)| m.from == mv.from && m.to == mv.to && m.hit == mv.hit) {
            Some((_, count)) => *count += 1,
            None => groups.push((*mv, 1)),
        }
    }
    groups
        .into_iter()
        .map(|(mv, count)| {
            let label = |loc: Location| match relative_index(color, loc) {
                0 => "off".to_string(),
                25 => "bar".to_string(),
                p => p.to_string(),
            };
            let mut text = format!("{}/{}", label(mv.from), label(mv.to));
            if mv.hit {
                text.push('*');
            }
            if count > 1 {
                text.push_str(&format!("({})", count));
            }
            text
        })
        .collect::<Vec<_>>()
        .join(" ")
}
