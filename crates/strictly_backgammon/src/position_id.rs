//! gnubg Position ID codec.
//!
//! A Position ID packs both sides' checkers into an 80-bit key, encoded as
//! 14 Base64 characters. The key lists the opponent's 25 slots first, then
//! the slots of the player on roll. Each side's slots run from its own
//! 1-point through its 24-point, then the bar. A slot holding `n` checkers
//! writes `n` one-bits followed by a zero-bit. Bits are packed least
//! significant first.

use crate::board::Board;
use crate::types::{CHECKERS_PER_SIDE, Color, Location, POINTS};
use tracing::instrument;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const KEY_BYTES: usize = 10;
const ID_LEN: usize = 14;
const SLOTS: u8 = POINTS + 1;

/// Errors decoding a Position ID.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum PositionIdError {
    /// Not 14 characters long.
    #[display("Position ID must be {} characters, got {}", ID_LEN, _0)]
    InvalidLength(usize),
    /// Not a Base64 character.
    #[display("Invalid Position ID character '{}'", _0)]
    InvalidCharacter(char),
    /// A side has more than 15 checkers.
    #[display("{} has more than 15 checkers", _0)]
    TooManyCheckers(Color),
    /// The decoded layout is not a legal board.
    #[display("Invalid position: {}", _0)]
    InvalidBoard(String),
}

impl std::error::Error for PositionIdError {}

/// Encodes `board` with `on_roll` as the player to move.
#[instrument(skip(board))]
pub fn encode(board: &Board, on_roll: Color) -> String {
    let mut key = [0u8; KEY_BYTES];
    let mut bit = 0usize;
    for color in [on_roll.opponent(), on_roll] {
        for slot in 0..SLOTS {
            for _ in 0..checkers_in_slot(board, color, slot) {
                key[bit / 8] |= 1 << (bit % 8);
                bit += 1;
            }
            bit += 1;
        }
    }
    base64_encode(&key)
}

/// Decodes a Position ID, interpreting the second half of the key as `on_roll`.
#[instrument]
pub fn decode(id: &str, on_roll: Color) -> Result<Board, PositionIdError> {
    let key = base64_decode(id.trim())?;
    let mut bits = (0..KEY_BYTES * 8).map(|i| key[i / 8] >> (i % 8) & 1 == 1);
    let mut layouts: [Vec<(Location, u8)>; 2] = [Vec::new(), Vec::new()];
    for color in [on_roll.opponent(), on_roll] {
        let mut total = 0u8;
        for slot in 0..SLOTS {
            let mut count = 0u8;
            while bits.next() == Some(true) {
                count += 1;
                total += 1;
                if total > CHECKERS_PER_SIDE {
                    return Err(PositionIdError::TooManyCheckers(color));
                }
            }
            if count > 0 {
                let location = if slot == POINTS {
                    Location::Bar
                } else {
                    Location::Point(color.point_at(slot + 1))
                };
                layouts[color.index()].push((location, count));
            }
        }
    }
    Board::from_layout(&layouts[Color::White.index()], &layouts[Color::Red.index()])
        .map_err(|v| PositionIdError::InvalidBoard(v.description))
}

fn checkers_in_slot(board: &Board, color: Color, slot: u8) -> u8 {
    if slot == POINTS {
        board.bar(color)
    } else {
        board.checkers_at(color, color.point_at(slot + 1))
    }
}

fn base64_encode(key: &[u8; KEY_BYTES]) -> String {
    let mut out = String::with_capacity(ID_LEN + 2);
    for chunk in key.chunks(3) {
        let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let n = (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32;
        let chars = chunk.len() + 1;
        for i in 0..chars {
            let index = (n >> (18 - 6 * i)) & 0x3f;
            out.push(ALPHABET[index as usize] as char);
        }
    }
    out
}

fn base64_decode(id: &str) -> Result<[u8; KEY_BYTES], PositionIdError> {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() != ID_LEN {
        return Err(PositionIdError::InvalidLength(chars.len()));
    }
    let mut bits: u128 = 0;
    for &c in &chars {
        let value = ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(PositionIdError::InvalidCharacter(c))?;
        bits = bits << 6 | value as u128;
    }
    // 84 bits read; the trailing 4 are padding.
    bits >>= 4;
    let mut key = [0u8; KEY_BYTES];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = (bits >> (8 * (KEY_BYTES - 1 - i))) as u8;
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "4HPwATDgc/ABMA";

    #[test]
    fn test_starting_position_id() {
        assert_eq!(encode(&Board::new(), Color::White), START);
        assert_eq!(encode(&Board::new(), Color::Red), START);
    }

    #[test]
    fn test_decode_starting_position() {
        assert_eq!(decode(START, Color::White).unwrap(), Board::new());
        assert_eq!(decode(START, Color::Red).unwrap(), Board::new());
    }

    #[test]
    fn test_bar_and_borne_off_survive() {
        let board = Board::from_layout(
            &[(Location::Bar, 2), (Location::Point(3), 4)],
            &[(Location::Point(20), 5), (Location::Point(1), 1)],
        )
        .unwrap();
        let id = encode(&board, Color::Red);
        assert_eq!(id.len(), 14);
        assert_eq!(decode(&id, Color::Red).unwrap(), board);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(decode("short", Color::White), Err(PositionIdError::InvalidLength(5)));
        assert_eq!(
            decode("4HPwATDgc/AB!A", Color::White),
            Err(PositionIdError::InvalidCharacter('!'))
        );
    }
}
