//! End-to-end scenarios through the public game and match API.

use strictly_backgammon::{
    Board, Color, CubeError, DiceRoll, FixedDice, Game, GameError, GameMode, GamePhase, IllegalMove,
    Location, Match, MatchStatus, MoveGenerator, OpponentKind, Outcome, WinType, notation,
    position_id,
};

#[test]
fn test_standard_opening_three_one() {
    let board = Board::new();
    assert_eq!(board.pip_count(Color::White), 167);
    assert_eq!(board.pip_count(Color::Red), 167);

    let plays = MoveGenerator::sequences(&board, Color::White, &[3, 1]);
    let texts: Vec<String> = plays
        .iter()
        .map(|p| notation::format(Color::White, p.moves()))
        .collect();
    assert!(plays.iter().all(|p| p.dice_used() == 2));
    assert!(
        plays
            .iter()
            .any(|p| p.result().checkers_at(Color::White, 5) == 2),
        "8/5 6/5 missing from {:?}",
        texts
    );
    assert!(texts.iter().any(|t| t.contains("24/21")), "24/21 missing from {:?}", texts);
}

#[test]
fn test_forced_bar_entry_with_blocked_point() {
    let board = Board::from_layout(
        &[(Location::Bar, 1), (Location::Point(13), 14)],
        &[(Location::Point(19), 3), (Location::Point(1), 12)],
    )
    .unwrap();
    assert!(MoveGenerator::sequences(&board, Color::White, &[6, 6, 6, 6]).is_empty());

    let mut game = Game::from_position(board, Color::White, GameMode::Standard, false).unwrap();
    let outcome = game.roll(Color::White, &mut FixedDice::new([6, 6])).unwrap();
    assert!(outcome.no_legal_moves);
    assert_eq!(game.on_roll(), Color::Red);
    assert_eq!(game.phase(), GamePhase::AwaitingRoll);

    let mut game = Game::from_position(board, Color::White, GameMode::Standard, false).unwrap();
    game.roll(Color::White, &mut FixedDice::new([6, 5])).unwrap();
    assert_eq!(
        game.apply_move(Color::White, Location::Point(13), Location::Point(7)),
        Err(GameError::InvalidMove(IllegalMove::BarEntryRequired))
    );
    assert_eq!(game.valid_sources(), vec![Location::Bar]);
}

#[test]
fn test_gammon_scores_four_with_cube_two() {
    let board = Board::from_layout(
        &[(Location::Point(2), 1)],
        &[(Location::Point(12), 10), (Location::Point(18), 5)],
    )
    .unwrap();
    let mut m = Match::new(7, OpponentKind::Human).unwrap();
    let (id, game) = m
        .start_next_game(GameMode::Standard, &mut FixedDice::new([5, 2]))
        .unwrap();
    let mut game = game.resume_at(board, Color::White).unwrap();
    assert_eq!(m.context().is_crawford_game(), game.is_crawford());
    game.offer_double(Color::White).unwrap();
    game.accept_double(Color::Red).unwrap();
    game.roll(Color::White, &mut FixedDice::new([4, 3])).unwrap();
    game.apply_move(Color::White, Location::Point(2), Location::Off).unwrap();

    let outcome = game.outcome().unwrap();
    let result = *outcome.result().unwrap();
    assert_eq!(result.win_type, WinType::Gammon);
    assert_eq!(result.points(), 4);

    m.complete_game(id, &outcome).unwrap();
    assert_eq!(m.score(Color::White), 4);
}

#[test]
fn test_crawford_sequence_to_five() {
    let mut m = Match::new(5, OpponentKind::Bot("greedy".into())).unwrap();
    let mut dice = FixedDice::opening(4, 2, &[]);

    let (id, game) = m.start_next_game(GameMode::Standard, &mut dice).unwrap();
    assert!(!game.is_crawford());
    let win = |winner, win_type, cube_value| {
        Outcome::Won(strictly_backgammon::GameResult {
            winner,
            win_type,
            cube_value,
        })
    };
    m.complete_game(id, &win(Color::Red, WinType::Normal, 4)).unwrap();
    assert_eq!(m.score(Color::Red), 4);

    let (id, mut game) = m.start_next_game(GameMode::Standard, &mut dice).unwrap();
    assert!(game.is_crawford());
    assert_eq!(
        game.offer_double(game.on_roll()),
        Err(GameError::CannotDouble(CubeError::Crawford))
    );
    m.complete_game(id, &win(Color::White, WinType::Gammon, 1)).unwrap();

    let (id, game) = m.start_next_game(GameMode::Standard, &mut dice).unwrap();
    assert!(!game.is_crawford());
    let status = m.complete_game(id, &win(Color::Red, WinType::Normal, 1)).unwrap();
    assert_eq!(status, MatchStatus::Completed { winner: Color::Red });
}

#[test]
fn test_cube_value_progression() {
    let mut game = Game::from_position(Board::new(), Color::White, GameMode::Standard, false).unwrap();
    assert_eq!(game.cube().value(), 1);
    game.offer_double(Color::White).unwrap();
    assert_eq!(game.accept_double(Color::Red), Ok(2));
    assert_eq!(game.cube().owner(), Some(Color::Red));

    game.roll(Color::White, &mut FixedDice::new([6, 5])).unwrap();
    let play = game.legal_sequences()[0].moves().to_vec();
    game.play_sequence(Color::White, &play).unwrap();
    game.end_turn(Color::White).unwrap();

    game.offer_double(Color::Red).unwrap();
    assert_eq!(game.cube().pending_offer(), Some(Color::Red));
    assert_eq!(game.accept_double(Color::White), Ok(4));
    assert_eq!(game.cube().owner(), Some(Color::White));
}

#[test]
fn test_analysis_position_round_trip() {
    let board = position_id::decode("4HPwATDgc/ABMA", Color::White).unwrap();
    let mut game = Game::from_position(board, Color::White, GameMode::Analysis, false).unwrap();
    game.set_dice(Color::White, DiceRoll::new(3, 1).unwrap()).unwrap();
    let play = notation::resolve(game.board(), Color::White, &[3, 1], "8/5 6/5").unwrap();
    game.play_sequence(Color::White, play.moves()).unwrap();
    game.end_turn(Color::White).unwrap();
    assert_eq!(game.on_roll(), Color::Red);

    let json = serde_json::to_string(&game).unwrap();
    let restored: Game = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, game);
}
