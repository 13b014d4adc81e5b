//! Command-line interface for strictly_gammon.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use strictly_backgammon::Color;

/// Strictly Gammon - backgammon engine with pluggable bots and evaluators
#[derive(Parser, Debug)]
#[command(name = "strictly_gammon")]
#[command(about = "Backgammon rules engine, bots and analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    /// White, moving from 24 down to 1
    White,
    /// Red, moving from 1 up to 24
    Red,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Red => Color::Red,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a match between two bots
    Play {
        /// White bot: preset name or registry id
        #[arg(long, default_value = "heuristic")]
        white: String,

        /// Red bot: preset name or registry id
        #[arg(long, default_value = "greedy")]
        red: String,

        /// Points needed to win the match
        #[arg(short, long, default_value = "5")]
        target: u32,

        /// Seed for dice and random bots
        #[arg(long)]
        seed: Option<u64>,

        /// Directory containing bot preset .toml files
        #[arg(long)]
        bots_dir: Option<PathBuf>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List registered bots and whether they can run here
    Bots,

    /// Rank the plays for a position and roll
    Analyze {
        /// gnubg Position ID, from the side on roll
        #[arg(long, default_value = "4HPwATDgc/ABMA")]
        position: String,

        /// Side on roll
        #[arg(long, value_enum, default_value = "white")]
        side: Side,

        /// The two dice
        #[arg(long, num_args = 2, value_names = ["DIE", "DIE"])]
        dice: Vec<u8>,

        /// Evaluator registry id
        #[arg(short, long, default_value = "heuristic")]
        evaluator: String,

        /// How many plays to print
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// List bot presets
    Presets {
        /// Directory containing bot preset .toml files
        #[arg(long)]
        bots_dir: Option<PathBuf>,
    },
}
