//! Doubling cube state machine.

use crate::types::Color;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Whether a double is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CubeState {
    /// No offer pending.
    Idle,
    /// A double offered by the given color awaits a response.
    Offered(Color),
}

/// Reasons a cube action is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum CubeError {
    /// Doubling is not allowed in the Crawford game.
    #[display("Doubling is not allowed in the Crawford game")]
    Crawford,
    /// An offer is already pending.
    #[display("A double is already pending")]
    OfferPending,
    /// The cube is owned by the other color.
    #[display("{} does not own the cube", _0)]
    NotOwner(Color),
    /// No offer to respond to.
    #[display("No double has been offered")]
    NotOffered,
    /// A color cannot respond to its own offer.
    #[display("{} cannot respond to its own double", _0)]
    OwnOffer(Color),
    /// The game mode disables the cube.
    #[display("The doubling cube is disabled in this game")]
    Disabled,
    /// Doubles are offered before rolling, not mid-turn.
    #[display("Doubles may only be offered before rolling")]
    AfterRoll,
    /// The cube cannot be turned any higher.
    #[display("The cube already shows {}", _0)]
    AtMaximum(u32),
}

impl std::error::Error for CubeError {}

/// The doubling cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoublingCube {
    value: u32,
    owner: Option<Color>,
    state: CubeState,
}

impl DoublingCube {
    /// A centered cube showing 1.
    pub fn new() -> Self {
        Self {
            value: 1,
            owner: None,
            state: CubeState::Idle,
        }
    }

    /// Current stakes multiplier.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Color that may next double, or `None` while centered.
    pub fn owner(&self) -> Option<Color> {
        self.owner
    }

    /// Pending offer state.
    pub fn state(&self) -> CubeState {
        self.state
    }

    /// Color with a pending offer, if any.
    pub fn pending_offer(&self) -> Option<Color> {
        match self.state {
            CubeState::Offered(by) => Some(by),
            CubeState::Idle => None,
        }
    }

    /// Whether `color` holds cube access (centered or owned).
    pub fn has_access(&self, color: Color) -> bool {
        self.owner.is_none_or(|owner| owner == color)
    }

    /// Checks whether `by` may offer now.
    pub fn check_offer(&self, by: Color, is_crawford: bool) -> Result<(), CubeError> {
        if is_crawford {
            return Err(CubeError::Crawford);
        }
        if self.state != CubeState::Idle {
            return Err(CubeError::OfferPending);
        }
        if !self.has_access(by) {
            return Err(CubeError::NotOwner(by));
        }
        if self.value.checked_mul(2).is_none() {
            return Err(CubeError::AtMaximum(self.value));
        }
        Ok(())
    }

    /// Offers a double.
    #[instrument(skip(self))]
    pub fn offer(&mut self, by: Color, is_crawford: bool) -> Result<(), CubeError> {
        if let Err(e) = self.check_offer(by, is_crawford) {
            warn!(error = %e, "Double rejected");
            return Err(e);
        }
        self.state = CubeState::Offered(by);
        info!(value = self.value, "Double offered");
        Ok(())
    }

    fn responder_check(&self, by: Color) -> Result<(), CubeError> {
        match self.state {
            CubeState::Idle => Err(CubeError::NotOffered),
            CubeState::Offered(offerer) if offerer == by => Err(CubeError::OwnOffer(by)),
            CubeState::Offered(_) => Ok(()),
        }
    }

    /// Accepts the pending double: value doubles and `by` owns the cube.
    #[instrument(skip(self))]
    pub fn accept(&mut self, by: Color) -> Result<u32, CubeError> {
        self.responder_check(by)?;
        self.value = self
            .value
            .checked_mul(2)
            .ok_or(CubeError::AtMaximum(self.value))?;
        self.owner = Some(by);
        self.state = CubeState::Idle;
        info!(value = self.value, owner = %by, "Double accepted");
        Ok(self.value)
    }

    /// Declines the pending double, returning the stakes forfeited (pre-double value).
    #[instrument(skip(self))]
    pub fn decline(&mut self, by: Color) -> Result<u32, CubeError> {
        self.responder_check(by)?;
        self.state = CubeState::Idle;
        info!(value = self.value, "Double declined");
        Ok(self.value)
    }
}

impl Default for DoublingCube {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_doubles_and_transfers_ownership() {
        let mut cube = DoublingCube::new();
        cube.offer(Color::White, false).unwrap();
        assert_eq!(cube.accept(Color::Red), Ok(2));
        assert_eq!(cube.owner(), Some(Color::Red));
        assert_eq!(cube.offer(Color::White, false), Err(CubeError::NotOwner(Color::White)));
        cube.offer(Color::Red, false).unwrap();
        assert_eq!(cube.accept(Color::White), Ok(4));
        assert_eq!(cube.owner(), Some(Color::White));
    }

    #[test]
    fn test_crawford_blocks_offer() {
        let mut cube = DoublingCube::new();
        assert_eq!(cube.offer(Color::Red, true), Err(CubeError::Crawford));
    }

    #[test]
    fn test_pending_offer_blocks_second_offer() {
        let mut cube = DoublingCube::new();
        cube.offer(Color::White, false).unwrap();
        assert_eq!(cube.offer(Color::Red, false), Err(CubeError::OfferPending));
        assert_eq!(cube.accept(Color::White), Err(CubeError::OwnOffer(Color::White)));
    }

    #[test]
    fn test_cube_never_overflows() {
        let top = 1u32 << 31;
        let mut cube = DoublingCube {
            value: top,
            owner: Some(Color::White),
            state: CubeState::Idle,
        };
        assert_eq!(cube.offer(Color::White, false), Err(CubeError::AtMaximum(top)));

        cube.state = CubeState::Offered(Color::White);
        assert_eq!(cube.accept(Color::Red), Err(CubeError::AtMaximum(top)));
        assert_eq!(cube.value(), top);
        assert_eq!(cube.pending_offer(), Some(Color::White));
        assert_eq!(cube.decline(Color::Red), Ok(top));
    }

    #[test]
    fn test_decline_returns_pre_double_value() {
        let mut cube = DoublingCube::new();
        assert_eq!(cube.decline(Color::Red), Err(CubeError::NotOffered));
        cube.offer(Color::White, false).unwrap();
        assert_eq!(cube.decline(Color::Red), Ok(1));
        assert_eq!(cube.value(), 1);
    }
}
