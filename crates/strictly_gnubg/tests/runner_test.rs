//! Tests for the gnubg runner and evaluator against stand-in executables.
//!
//! Each stand-in is a shell script that swallows the command script and
//! prints canned gnubg output.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use strictly_backgammon::{
    Board, Color, CubeRecommendation, DiceRoll, DoublingCube, Evaluator, EvaluatorError,
    MatchContext,
};
use strictly_gnubg::{GnubgConfig, GnubgEvaluator, GnubgRunner};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn stand_in(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("gnubg");
    std::fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\n{}\n", body)).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    path
}

fn config_for(path: PathBuf) -> GnubgConfig {
    GnubgConfig::default()
        .with_executable(path.to_string_lossy().into_owned())
        .with_timeout_ms(5_000)
}

#[tokio::test]
async fn test_version_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = stand_in(&dir, "echo 'GNU Backgammon 1.07.001'");
    assert!(GnubgRunner::new(config_for(path)).is_available().await);

    let other = tempfile::tempdir().unwrap();
    let path = stand_in(&other, "echo 'some other program'");
    assert!(!GnubgRunner::new(config_for(path)).is_available().await);
}

#[tokio::test]
async fn test_timeout_kills_process() {
    let dir = tempfile::tempdir().unwrap();
    let path = stand_in(&dir, "sleep 10");
    let runner = GnubgRunner::new(config_for(path).with_timeout_ms(200));
    let err = runner
        .execute(&["eval".to_string()], &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, EvaluatorError::Timeout(200));
}

#[tokio::test]
async fn test_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let path = stand_in(&dir, "sleep 10");
    let runner = GnubgRunner::new(config_for(path));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let err = runner.execute(&["eval".to_string()], &cancel).await.unwrap_err();
    assert_eq!(err, EvaluatorError::Cancelled);
}

#[tokio::test]
async fn test_best_moves_keep_only_legal_hints() {
    let dir = tempfile::tempdir().unwrap();
    let path = stand_in(
        &dir,
        "cat <<'OUT'
    1. Cubeful 2-ply    8/5 6/5                      Eq.: +0.163
    2. Cubeful 2-ply    13/7                         Eq.: +0.050 (-0.113)
    3. Cubeful 2-ply    24/23 13/10                  Eq.: -0.010 (-0.173)
OUT",
    );
    let evaluator = GnubgEvaluator::new(config_for(path));
    let analysis = evaluator
        .find_best_moves(
            &Board::new(),
            Color::White,
            DiceRoll::new(3, 1).unwrap(),
            &MatchContext::money_game(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(analysis.top_moves().len(), 2);
    let best = analysis.best().unwrap();
    assert_eq!(best.equity, 0.163);
    assert_eq!(best.moves.len(), 2);
}

#[tokio::test]
async fn test_pending_double_answered_as_taker() {
    let dir = tempfile::tempdir().unwrap();
    let path = stand_in(
        &dir,
        "cat <<'OUT'
1. Double, pass               +1.000
2. Double, take               +1.350  (+0.350)
3. No double                  +0.900  (-0.100)
Proper cube action: Double, pass
OUT",
    );
    let evaluator = GnubgEvaluator::new(config_for(path));
    let mut cube = DoublingCube::new();
    cube.offer(Color::White, false).unwrap();
    let decision = evaluator
        .analyze_cube_decision(
            &Board::new(),
            Color::Red,
            &cube,
            &MatchContext::money_game(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(decision.recommendation, CubeRecommendation::Pass);
}

#[cfg(feature = "gnubg")]
#[tokio::test]
async fn test_real_gnubg_opening_roll() {
    let config = GnubgConfig::from_env().unwrap();
    let evaluator = GnubgEvaluator::new(config);
    assert!(evaluator.is_available().await, "gnubg not found");
    let analysis = evaluator
        .find_best_moves(
            &Board::new(),
            Color::White,
            DiceRoll::new(3, 1).unwrap(),
            &MatchContext::money_game(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!analysis.is_empty());
}
