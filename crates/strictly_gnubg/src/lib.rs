//! GNU Backgammon as an external evaluator.
//!
//! Each call spawns `gnubg -t`, loads the position by Position ID, asks one
//! question (`eval`, `hint` or `hint cube`) and parses the text answer.
//! Hint lines are mapped back onto the engine's own legal plays, so gnubg
//! can rank moves but never introduce one.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod commands;
mod config;
mod evaluator;
pub mod parser;
mod runner;

pub use config::{
    ConfigError, ENV_EXECUTABLE, ENV_PLIES, ENV_TIMEOUT_MS, ENV_VERBOSE, GnubgConfig,
};
pub use evaluator::GnubgEvaluator;
pub use parser::HintLine;
pub use runner::GnubgRunner;

use std::sync::Arc;
use strictly_backgammon::{
    Bot, BotRegistry, EvaluatorBackedBot, Evaluator, EvaluatorRegistry, PluginInfo, RegistryError,
};
use tracing::instrument;

/// Registers the `gnubg` evaluator.
#[instrument(skip(registry))]
pub fn register_evaluator(
    registry: &mut EvaluatorRegistry,
    config: GnubgConfig,
) -> Result<(), RegistryError> {
    registry.register(GnubgEvaluator::plugin_info(), move |_| {
        Ok(Arc::new(GnubgEvaluator::new(config.clone())) as Arc<dyn Evaluator>)
    })
}

/// Registers the `gnubg` bot, which plays gnubg's first choice.
///
/// The bot's time budget comes from the factory options; the process
/// timeout from `config` still applies inside it.
#[instrument(skip(registry))]
pub fn register_bot(registry: &mut BotRegistry, config: GnubgConfig) -> Result<(), RegistryError> {
    let info = PluginInfo::new("gnubg", "GNU Backgammon bot", 95, true);
    registry.register(info.clone(), move |options| {
        let evaluator: Arc<dyn Evaluator> = Arc::new(GnubgEvaluator::new(config.clone()));
        Ok(Arc::new(EvaluatorBackedBot::new(
            info.clone(),
            evaluator,
            options.timeout,
            options.fallback,
        )) as Arc<dyn Bot>)
    })
}
