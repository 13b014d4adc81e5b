//! Cube value is always a power of two.

use super::Invariant;
use crate::{DoublingCube, Game};

/// Invariant: the cube value is 1, 2, 4, 8, ... and a centered cube shows 1.
pub struct CubePowerInvariant;

impl Invariant<DoublingCube> for CubePowerInvariant {
    fn holds(cube: &DoublingCube) -> bool {
        let value = cube.value();
        value.is_power_of_two() && (cube.owner().is_some() || value == 1)
    }

    fn description() -> &'static str {
        "Cube value is a power of two and only a centered cube shows 1"
    }
}

impl Invariant<Game> for CubePowerInvariant {
    fn holds(game: &Game) -> bool {
        <Self as Invariant<DoublingCube>>::holds(game.cube())
    }

    fn description() -> &'static str {
        <Self as Invariant<DoublingCube>>::description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_doubling_keeps_power_of_two() {
        let mut cube = DoublingCube::new();
        assert!(CubePowerInvariant::holds(&cube));
        for (offerer, taker) in [(Color::White, Color::Red), (Color::Red, Color::White)] {
            cube.offer(offerer, false).expect("offer");
            cube.accept(taker).expect("accept");
            assert!(CubePowerInvariant::holds(&cube));
        }
        assert_eq!(cube.value(), 4);
    }
}
