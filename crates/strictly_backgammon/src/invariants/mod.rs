//! First-class invariants for backgammon.
//!
//! Invariants are logical properties that must hold after every state
//! transition. They are testable independently and are checked as
//! postconditions in debug builds.

use serde::{Deserialize, Serialize};

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[display("Invariant violated: {}", description)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

fn collect(checks: &[(bool, &'static str)]) -> Result<(), Vec<InvariantViolation>> {
    let violations: Vec<InvariantViolation> = checks
        .iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(*description))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        collect(&[
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
        ])
    }
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        collect(&[
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
        ])
    }
}

pub mod checker_conservation;
pub mod cube_power;
pub mod exclusive_points;

pub use checker_conservation::CheckerConservationInvariant;
pub use cube_power::CubePowerInvariant;
pub use exclusive_points::ExclusivePointsInvariant;

/// All game invariants as a composable set.
pub type BackgammonInvariants = (
    CheckerConservationInvariant,
    ExclusivePointsInvariant,
    CubePowerInvariant,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Board, Color, Game, GameMode};

    #[test]
    fn test_invariant_set_holds_for_new_game() {
        let game = Game::from_position(Board::new(), Color::White, GameMode::Standard, false)
            .expect("valid position");
        assert!(BackgammonInvariants::check_all(&game).is_ok());
    }

    #[test]
    fn test_two_invariants_as_set() {
        type BoardOnly = (CheckerConservationInvariant, ExclusivePointsInvariant);
        assert!(BoardOnly::check_all(&Board::new()).is_ok());
    }

    #[test]
    fn test_violation_display() {
        let violation = InvariantViolation::new("White has 14 checkers");
        assert_eq!(violation.to_string(), "Invariant violated: White has 14 checkers");
    }
}
