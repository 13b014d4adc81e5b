//! Property checks over random playouts.

use strictly_backgammon::{
    Board, Color, DiceSource, Game, GameMode, GamePhase, Location, MoveGenerator, POINTS,
    RandomDice,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Plays random legal games, calling `visit` before every roll's play.
fn playouts(games: u64, mut visit: impl FnMut(&Board, Color, &[u8])) {
    for seed in 0..games {
        let mut dice = RandomDice::seeded(seed);
        let mut rng = StdRng::seed_from_u64(seed + 1000);
        let mut game = Game::new(GameMode::Standard, false, &mut dice).unwrap();
        for _ in 0..400 {
            match game.phase() {
                GamePhase::AwaitingRoll => {
                    let color = game.on_roll();
                    game.roll(color, &mut dice).unwrap();
                }
                GamePhase::AwaitingMove => {
                    let color = game.on_roll();
                    visit(game.board(), color, game.turn().remaining());
                    let plays = game.legal_sequences();
                    let pick = rng.gen_range(0..plays.len());
                    game.play_sequence(color, plays[pick].moves()).unwrap();
                    assert!(game.board().verify().is_ok());
                }
                GamePhase::TurnComplete => {
                    let color = game.on_roll();
                    game.end_turn(color).unwrap();
                }
                GamePhase::GameOver(_) => break,
            }
        }
    }
}

/// Most dice usable, by exhaustive search without pruning.
fn brute_force_max(board: &Board, color: Color, dice: &[u8]) -> usize {
    let mut best = 0;
    for (i, &die) in dice.iter().enumerate() {
        let mut rest = dice.to_vec();
        rest.remove(i);
        let sources = std::iter::once(Location::Bar).chain((1..=POINTS).map(Location::Point));
        for from in sources {
            if let Ok(mv) = board.check_move(color, from, die) {
                let next = board.apply(color, &mv).unwrap();
                best = best.max(1 + brute_force_max(&next, color, &rest));
                if best == dice.len() {
                    return best;
                }
            }
        }
    }
    best
}

#[test]
fn test_checkers_conserved_through_random_games() {
    playouts(6, |board, _, _| {
        for color in [Color::White, Color::Red] {
            assert_eq!(board.checker_total(color), 15);
        }
    });
}

#[test]
fn test_generated_plays_are_maximal() {
    let mut checked = 0;
    playouts(3, |board, color, dice| {
        let expected = brute_force_max(board, color, dice);
        let plays = MoveGenerator::sequences(board, color, dice);
        let longest = plays.iter().map(|p| p.dice_used()).max().unwrap_or(0);
        assert_eq!(longest, expected);
        assert!(plays.iter().all(|p| p.dice_used() == expected));
        checked += 1;
    });
    assert!(checked > 0);
}

#[test]
fn test_random_dice_stay_in_range() {
    let mut dice = RandomDice::seeded(99);
    for _ in 0..500 {
        let roll = dice.roll();
        assert!((1..=6).contains(&roll.low()) && roll.high() <= 6);
    }
}
