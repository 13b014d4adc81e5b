//! Strictly Gammon - command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use strictly_backgammon::{
    Color, DiceRoll, DiceSource, DoublingCube, MatchContext, PluginOptions, RandomDice, notation,
    position_id,
};
use strictly_gammon::cli::{Cli, Command};
use strictly_gammon::{
    BotLibrary, MatchEvent, MatchOrchestrator, SessionManager, bot_registry, evaluator_registry,
    resolve_bot,
};
use strictly_gnubg::GnubgConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let gnubg = GnubgConfig::from_env()?;

    match cli.command {
        Command::Play {
            white,
            red,
            target,
            seed,
            bots_dir,
            json,
        } => run_play(&gnubg, &white, &red, target, seed, bots_dir, json).await,
        Command::Bots => run_bots(&gnubg).await,
        Command::Analyze {
            position,
            side,
            dice,
            evaluator,
            top,
        } => run_analyze(&gnubg, &position, side.into(), &dice, &evaluator, top).await,
        Command::Presets { bots_dir } => run_presets(bots_dir),
    }
}

fn load_library(dir: Option<PathBuf>) -> Result<BotLibrary> {
    let library = match dir {
        Some(dir) => BotLibrary::scan(dir)?,
        None => BotLibrary::scan_default()?,
    };
    Ok(library)
}

#[instrument(skip(gnubg, bots_dir))]
async fn run_play(
    gnubg: &GnubgConfig,
    white: &str,
    red: &str,
    target: u32,
    seed: Option<u64>,
    bots_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let library = match load_library(bots_dir) {
        Ok(library) => Some(library),
        Err(e) => {
            warn!(error = %e, "No bot presets loaded, using registry ids only");
            None
        }
    };
    let registry = bot_registry(gnubg)?;
    let white_bot = resolve_bot(white, library.as_ref(), &registry, seed)?;
    let red_bot = resolve_bot(red, library.as_ref(), &registry, seed.map(|s| s.wrapping_add(1)))?;

    let sessions = match seed {
        Some(seed) => {
            let counter = Arc::new(std::sync::atomic::AtomicU64::new(seed));
            SessionManager::with_dice(Arc::new(move || {
                let next = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Box::new(RandomDice::seeded(next)) as Box<dyn DiceSource + Send>
            }))
        }
        None => SessionManager::new(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = MatchOrchestrator::new(sessions, white_bot, red_bot, tx);
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "Failed to encode event"),
                }
            } else {
                print_event(&event);
            }
        }
    });

    let record = orchestrator.run(target, &cancel).await?;
    drop(orchestrator);
    printer.await.context("event printer failed")?;
    info!(
        white = record.score(Color::White),
        red = record.score(Color::Red),
        games = record.records().len(),
        "Match done"
    );
    Ok(())
}

fn print_event(event: &MatchEvent) {
    match event {
        MatchEvent::GameStarted { game, crawford } => {
            println!("== {}{}", game, if *crawford { " (Crawford)" } else { "" });
        }
        MatchEvent::Game { event, .. } => match event {
            strictly_backgammon::GameEvent::Turn(turn) => match turn.dice() {
                Some(dice) if turn.moves().is_empty() => {
                    println!("{:>5} {}: no move", turn.color(), dice)
                }
                Some(dice) => println!(
                    "{:>5} {}: {}",
                    turn.color(),
                    dice,
                    notation::format(turn.color(), turn.moves())
                ),
                None => {}
            },
            other => println!("      {:?}", other),
        },
        MatchEvent::GameFinished {
            outcome,
            white_score,
            red_score,
            ..
        } => println!("-- {} | White {} Red {}", outcome, white_score, red_score),
        MatchEvent::MatchFinished { status } => println!("== Match {:?}", status),
    }
}

#[instrument(skip(gnubg))]
async fn run_bots(gnubg: &GnubgConfig) -> Result<()> {
    let registry = bot_registry(gnubg)?;
    for info in registry.list() {
        let available = match registry.create(info.id(), &PluginOptions::default()) {
            Ok(bot) => bot.is_available().await,
            Err(_) => false,
        };
        println!(
            "{:<10} {:<28} strength {:>3}  external {:<5}  available {}",
            info.id(),
            info.display_name(),
            info.estimated_strength(),
            info.requires_external_resources(),
            available
        );
    }
    Ok(())
}

#[instrument(skip(gnubg))]
async fn run_analyze(
    gnubg: &GnubgConfig,
    position: &str,
    color: Color,
    dice: &[u8],
    evaluator_id: &str,
    top: usize,
) -> Result<()> {
    let board = position_id::decode(position, color)?;
    let registry = evaluator_registry(gnubg)?;
    let evaluator = registry.create(evaluator_id, &PluginOptions::default())?;
    let context = MatchContext::money_game();
    let cancel = CancellationToken::new();

    println!("{}", board.display());
    let evaluation = evaluator
        .evaluate_position(&board, color, &context, &cancel)
        .await?;
    println!(
        "{} on roll: equity {:+.3}  win {:.1}%  gammon {:.1}%",
        color,
        evaluation.equity,
        evaluation.win * 100.0,
        evaluation.win_gammon * 100.0
    );

    if let [a, b] = dice {
        let roll = DiceRoll::new(*a, *b)?;
        let analysis = evaluator
            .find_best_moves(&board, color, roll, &context, &cancel)
            .await?;
        for (rank, play) in analysis.top_moves().iter().take(top).enumerate() {
            println!(
                "{:>3}. {:<24} {:+.3}",
                rank + 1,
                notation::format(color, &play.moves),
                play.equity
            );
        }
    } else {
        let decision = evaluator
            .analyze_cube_decision(&board, color, &DoublingCube::new(), &context, &cancel)
            .await?;
        println!(
            "cube: {}  (no double {:+.3}, take {:+.3}, pass {:+.3})",
            decision.recommendation,
            decision.no_double_equity,
            decision.double_take_equity,
            decision.double_pass_equity
        );
    }
    Ok(())
}

fn run_presets(bots_dir: Option<PathBuf>) -> Result<()> {
    let library = load_library(bots_dir)?;
    for preset in library.presets() {
        println!(
            "{:<24} bot {:<10} timeout {}ms  fallback {}",
            preset.name(),
            preset.bot(),
            preset.timeout_ms(),
            preset.fallback()
        );
    }
    Ok(())
}
