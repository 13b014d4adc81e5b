//! Strictly Gammon - backgammon sessions, bot presets and match orchestration.
//!
//! # Architecture
//!
//! - **Sessions**: games and matches addressed by id, each behind its own lock
//! - **Presets**: named bot configurations loaded from TOML files
//! - **Orchestrator**: plays whole matches between two bots and streams events
//! - **Plugins**: the engine's built-in bots and evaluators plus gnubg
//!
//! # Example
//!
//! ```no_run
//! use strictly_gammon::{MatchOrchestrator, SessionManager, bot_registry, resolve_bot};
//! use strictly_gnubg::GnubgConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = bot_registry(&GnubgConfig::default())?;
//! let white = resolve_bot("heuristic", None, &registry, None)?;
//! let red = resolve_bot("greedy", None, &registry, None)?;
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let orchestrator = MatchOrchestrator::new(SessionManager::new(), white, red, tx);
//! let record = orchestrator.run(3, &CancellationToken::new()).await?;
//! println!("{:?}", record.status());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bot_library;
pub mod cli;
mod config;
mod orchestrator;
mod plugins;
mod session;

pub use bot_library::{BOTS_DIR_ENV, BotLibrary};
pub use config::{BotConfig, ConfigError};
pub use orchestrator::{MatchEvent, MatchOrchestrator};
pub use plugins::{bot_registry, evaluator_registry, resolve_bot};
pub use session::{
    DiceFactory, GameSnapshot, MatchId, Seat, SessionError, SessionErrorKind, SessionManager,
    acting_color,
};
