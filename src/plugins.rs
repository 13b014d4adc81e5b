//! Registry assembly and bot lookup by preset or plugin id.

use crate::{BotConfig, BotLibrary};
use std::sync::Arc;
use strictly_backgammon::{Bot, BotRegistry, EvaluatorRegistry, PluginOptions, RegistryError};
use strictly_gnubg::GnubgConfig;
use tracing::{debug, instrument};

/// Built-in bots plus the gnubg bot.
#[instrument(skip(gnubg))]
pub fn bot_registry(gnubg: &GnubgConfig) -> Result<BotRegistry, RegistryError> {
    let mut registry = BotRegistry::with_defaults();
    strictly_gnubg::register_bot(&mut registry, gnubg.clone())?;
    Ok(registry)
}

/// Built-in evaluators plus gnubg.
#[instrument(skip(gnubg))]
pub fn evaluator_registry(gnubg: &GnubgConfig) -> Result<EvaluatorRegistry, RegistryError> {
    let mut registry = EvaluatorRegistry::with_defaults();
    strictly_gnubg::register_evaluator(&mut registry, gnubg.clone())?;
    Ok(registry)
}

/// Builds a bot by preset name, falling back to a plain registry id.
///
/// `seed` overrides the preset's seed when given.
#[instrument(skip(library, registry))]
pub fn resolve_bot(
    name: &str,
    library: Option<&BotLibrary>,
    registry: &BotRegistry,
    seed: Option<u64>,
) -> anyhow::Result<Arc<dyn Bot>> {
    if let Some(preset) = library.and_then(|lib| lib.get_by_name(name)) {
        debug!(bot = %preset.bot(), "Using bot preset");
        let mut options = preset.plugin_options();
        options.seed = seed.or(options.seed);
        return Ok(registry.create(preset.bot(), &options)?);
    }
    let options = PluginOptions {
        seed,
        ..BotConfig::new(name, name).plugin_options()
    };
    Ok(registry.create(name, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnubg_registered_alongside_builtins() {
        let registry = bot_registry(&GnubgConfig::default()).unwrap();
        let ids: Vec<&str> = registry.list().iter().map(|i| i.id().as_str()).collect();
        assert_eq!(ids, vec!["gnubg", "greedy", "heuristic", "random"]);
        assert!(evaluator_registry(&GnubgConfig::default()).unwrap().contains("gnubg"));
    }

    #[test]
    fn test_resolve_by_id_without_library() {
        let registry = bot_registry(&GnubgConfig::default()).unwrap();
        let bot = resolve_bot("random", None, &registry, Some(3)).unwrap();
        assert_eq!(bot.info().id(), "random");
        assert!(resolve_bot("nobody", None, &registry, None).is_err());
    }
}
