//! Dice rolls and dice sources.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, instrument};

/// An unordered pair of dice.
///
/// Stored high die first so that `(3, 1)` and `(1, 3)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceRoll {
    high: u8,
    low: u8,
}

/// Error building a dice roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("Die value {} is outside 1-6", _0)]
pub struct InvalidDie(pub u8);

impl std::error::Error for InvalidDie {}

impl DiceRoll {
    /// Creates a roll from two die values (1-6, any order).
    pub fn new(a: u8, b: u8) -> Result<Self, InvalidDie> {
        for die in [a, b] {
            if !(1..=6).contains(&die) {
                return Err(InvalidDie(die));
            }
        }
        Ok(Self {
            high: a.max(b),
            low: a.min(b),
        })
    }

    /// The higher die.
    pub fn high(&self) -> u8 {
        self.high
    }

    /// The lower die.
    pub fn low(&self) -> u8 {
        self.low
    }

    /// Whether both dice show the same value.
    pub fn is_double(&self) -> bool {
        self.high == self.low
    }

    /// Die values available to play: four for doubles, otherwise two.
    pub fn values(&self) -> Vec<u8> {
        if self.is_double() {
            vec![self.high; 4]
        } else {
            vec![self.high, self.low]
        }
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.high, self.low)
    }
}

/// Anything that can throw a single die.
pub trait DiceSource {
    /// Rolls one die (1-6).
    fn roll_die(&mut self) -> u8;

    /// Rolls a pair of dice.
    fn roll(&mut self) -> DiceRoll {
        let a = self.roll_die().clamp(1, 6);
        let b = self.roll_die().clamp(1, 6);
        DiceRoll {
            high: a.max(b),
            low: a.min(b),
        }
    }
}

/// Dice backed by a random number generator.
#[derive(Debug, Clone)]
pub struct RandomDice<R = StdRng> {
    rng: R,
}

impl RandomDice<StdRng> {
    /// Dice seeded from the operating system.
    #[instrument]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible dice.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        debug!(seed, "Creating seeded dice");
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomDice<R> {
    /// Wraps an existing generator.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DiceSource for RandomDice<R> {
    fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }
}

/// Scripted dice for tests and replays.
///
/// Returns the scripted values in order and cycles once exhausted.
#[derive(Debug, Clone)]
pub struct FixedDice {
    script: VecDeque<u8>,
}

impl FixedDice {
    /// Creates scripted dice from individual die values.
    pub fn new(values: impl IntoIterator<Item = u8>) -> Self {
        let script: VecDeque<u8> = values.into_iter().map(|v| v.clamp(1, 6)).collect();
        Self {
            script: if script.is_empty() {
                VecDeque::from([1])
            } else {
                script
            },
        }
    }

    /// Scripts an opening throw (`white`, `red`) followed by full rolls.
    pub fn opening(white: u8, red: u8, rolls: &[(u8, u8)]) -> Self {
        let mut values = vec![white, red];
        for &(a, b) in rolls {
            values.push(a);
            values.push(b);
        }
        Self::new(values)
    }
}

impl DiceSource for FixedDice {
    fn roll_die(&mut self) -> u8 {
        let value = self.script.pop_front().unwrap_or(1);
        self.script.push_back(value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_is_unordered() {
        assert_eq!(DiceRoll::new(3, 1).unwrap(), DiceRoll::new(1, 3).unwrap());
    }

    #[test]
    fn test_doubles_yield_four_values() {
        assert_eq!(DiceRoll::new(4, 4).unwrap().values(), vec![4, 4, 4, 4]);
        assert_eq!(DiceRoll::new(2, 5).unwrap().values(), vec![5, 2]);
    }

    #[test]
    fn test_invalid_die_rejected() {
        assert_eq!(DiceRoll::new(0, 3), Err(InvalidDie(0)));
        assert_eq!(DiceRoll::new(3, 7), Err(InvalidDie(7)));
    }

    #[test]
    fn test_seeded_dice_reproducible() {
        let mut a = RandomDice::seeded(7);
        let mut b = RandomDice::seeded(7);
        for _ in 0..20 {
            let roll = a.roll();
            assert_eq!(roll, b.roll());
            assert!((1..=6).contains(&roll.high()));
        }
    }

    #[test]
    fn test_fixed_dice_cycles() {
        let mut dice = FixedDice::new([6, 5]);
        assert_eq!(dice.roll(), DiceRoll::new(6, 5).unwrap());
        assert_eq!(dice.roll(), DiceRoll::new(5, 6).unwrap());
    }
}
