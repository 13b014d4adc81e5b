//! Game mode policies.

use crate::types::Color;
use serde::{Deserialize, Serialize};

/// Turn-ownership rule and feature flags injected into a [`crate::Game`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    /// Two seats; only the color on roll may act, cube enabled.
    #[default]
    Standard,
    /// One client drives both colors, the cube is off, dice may be set by hand.
    Analysis,
}

impl GameMode {
    /// Whether `actor` may act when `on_roll` is on roll.
    pub fn may_act(self, actor: Color, on_roll: Color) -> bool {
        match self {
            GameMode::Standard => actor == on_roll,
            GameMode::Analysis => true,
        }
    }

    /// Whether the doubling cube is in play.
    pub fn cube_enabled(self) -> bool {
        matches!(self, GameMode::Standard)
    }

    /// Whether dice may be set manually.
    pub fn manual_dice(self) -> bool {
        matches!(self, GameMode::Analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_standard_enforces_turns() {
        assert!(GameMode::Standard.may_act(Color::White, Color::White));
        assert!(!GameMode::Standard.may_act(Color::Red, Color::White));
        assert!(GameMode::Analysis.may_act(Color::Red, Color::White));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(GameMode::from_str("analysis").unwrap(), GameMode::Analysis);
    }
}
