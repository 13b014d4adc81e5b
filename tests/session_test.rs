//! Tests for SessionManager games, matches and bot turns.

use std::sync::Arc;
use strictly_backgammon::{
    Color, DiceSource, FixedDice, GameMode, MatchStatus, OpponentKind, RandomBot, RandomDice,
};
use strictly_gammon::{Seat, SessionErrorKind, SessionManager};
use tokio_util::sync::CancellationToken;

fn scripted(values: &'static [u8]) -> SessionManager {
    SessionManager::with_dice(Arc::new(move || {
        Box::new(FixedDice::new(values.iter().copied())) as Box<dyn DiceSource + Send>
    }))
}

fn seeded(seed: u64) -> SessionManager {
    let counter = Arc::new(std::sync::atomic::AtomicU64::new(seed));
    SessionManager::with_dice(Arc::new(move || {
        let next = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Box::new(RandomDice::seeded(next)) as Box<dyn DiceSource + Send>
    }))
}

#[tokio::test]
async fn test_match_abandoned_game_then_pass() {
    let sessions = scripted(&[3, 1]);
    let match_id = sessions.create_match(3, OpponentKind::Human).unwrap();

    let first = sessions.start_next_game(match_id, GameMode::Standard).await.unwrap();
    sessions.abandon(first).await.unwrap();
    assert_eq!(sessions.complete_game(match_id).await.unwrap(), MatchStatus::InProgress);

    let second = sessions.start_next_game(match_id, GameMode::Standard).await.unwrap();
    assert_ne!(first, second);
    sessions.roll(second, Color::White).await.unwrap();
    sessions.play_notation(second, Color::White, "8/5 6/5").await.unwrap();
    sessions.end_turn(second, Color::White).await.unwrap();
    sessions.offer_double(second, Color::Red).await.unwrap();
    sessions.decline_double(second, Color::White).await.unwrap();

    let status = sessions.complete_game(match_id).await.unwrap();
    assert_eq!(status, MatchStatus::InProgress);
    let record = sessions.match_snapshot(match_id).await.unwrap();
    assert_eq!(record.score(Color::Red), 1);
    assert_eq!(record.records().len(), 2);
}

#[tokio::test]
async fn test_cannot_complete_unfinished_game() {
    let sessions = scripted(&[5, 2]);
    let match_id = sessions.create_match(3, OpponentKind::Human).unwrap();
    sessions.start_next_game(match_id, GameMode::Standard).await.unwrap();
    let err = sessions.complete_game(match_id).await.unwrap_err();
    assert_eq!(err.kind, SessionErrorKind::Rejected);
    assert!(sessions.start_next_game(match_id, GameMode::Standard).await.is_err());

    sessions.abandon_match(match_id).await.unwrap();
    let record = sessions.match_snapshot(match_id).await.unwrap();
    assert_eq!(record.status(), MatchStatus::Abandoned);
}

#[tokio::test]
async fn test_tied_opening_dice_do_not_stall_a_match() {
    let sessions = scripted(&[]);
    let match_id = sessions.create_match(3, OpponentKind::Human).unwrap();
    let err = sessions.start_next_game(match_id, GameMode::Standard).await.unwrap_err();
    assert_eq!(err.kind, SessionErrorKind::Rejected);
    // The match lock was released and no game was left in progress.
    let record = sessions.match_snapshot(match_id).await.unwrap();
    assert_eq!(record.status(), MatchStatus::InProgress);
    assert!(record.records().is_empty());
}

#[tokio::test]
async fn test_concurrent_actions_on_one_game_are_serialized() {
    let sessions = scripted(&[3, 1]);
    let id = sessions.create_game(Seat::Human, Seat::Human, GameMode::Standard).unwrap();
    let a = tokio::spawn({
        let sessions = sessions.clone();
        async move { sessions.roll(id, Color::White).await }
    });
    let b = tokio::spawn({
        let sessions = sessions.clone();
        async move { sessions.roll(id, Color::White).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let snapshot = sessions.snapshot(id).await.unwrap();
    assert_eq!(snapshot.game().turn().remaining().len(), 2);
}

#[tokio::test]
async fn test_parallel_bot_games_finish() {
    let sessions = seeded(42);
    let mut handles = Vec::new();
    for seed in 0..4u64 {
        let sessions = sessions.clone();
        handles.push(tokio::spawn(async move {
            let seat = Seat::Bot("random".into());
            let id = sessions.create_game(seat.clone(), seat, GameMode::Standard).unwrap();
            let bot = RandomBot::seeded(seed);
            let cancel = CancellationToken::new();
            for _ in 0..5_000 {
                if sessions.snapshot(id).await.unwrap().game().is_over() {
                    break;
                }
                sessions.play_bot_turn(id, &bot, &cancel).await.unwrap();
            }
            sessions.snapshot(id).await.unwrap()
        }));
    }
    for handle in handles {
        let snapshot = handle.await.unwrap();
        assert!(snapshot.game().outcome().is_some());
        for color in [Color::White, Color::Red] {
            assert_eq!(snapshot.game().board().checker_total(color), 15);
        }
    }
    assert_eq!(sessions.list_games().len(), 4);
}
