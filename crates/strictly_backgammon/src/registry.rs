//! Plugin registry mapping string ids to bot and evaluator factories.

use crate::bots::{Bot, EvaluatorBackedBot, FallbackPolicy, GreedyBot, RandomBot};
use crate::eval::{CubeThresholds, Evaluator, HeuristicEvaluator};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Metadata every bot and evaluator exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct PluginInfo {
    /// Registry id, e.g. `greedy`.
    id: String,
    /// Human-readable name.
    display_name: String,
    /// Rough playing strength, 0-100.
    estimated_strength: u8,
    /// Whether the plugin depends on an external process or service.
    requires_external_resources: bool,
}

impl PluginInfo {
    /// Creates plugin metadata.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        estimated_strength: u8,
        requires_external_resources: bool,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            estimated_strength: estimated_strength.min(100),
            requires_external_resources,
        }
    }
}

/// Options passed to plugin factories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    /// RNG seed for plugins that use randomness.
    pub seed: Option<u64>,
    /// Upper bound on a single evaluator call.
    pub timeout: Duration,
    /// What a bot does when its evaluator fails.
    pub fallback: FallbackPolicy,
    /// Cube thresholds for heuristic evaluation.
    pub thresholds: CubeThresholds,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            seed: None,
            timeout: Duration::from_secs(30),
            fallback: FallbackPolicy::FirstLegal,
            thresholds: CubeThresholds::default(),
        }
    }
}

/// Errors looking up or constructing plugins.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RegistryError {
    /// No plugin registered under the id.
    #[display("Unknown plugin '{}'", _0)]
    UnknownPlugin(String),
    /// The id is already taken.
    #[display("Plugin '{}' is already registered", _0)]
    DuplicatePlugin(String),
    /// The factory failed.
    #[display("Failed to construct plugin '{}': {}", id, message)]
    Construction {
        /// Plugin id.
        id: String,
        /// Cause.
        message: String,
    },
}

impl std::error::Error for RegistryError {}

/// Factory producing a plugin instance.
pub type Factory<T> = Arc<dyn Fn(&PluginOptions) -> Result<Arc<T>, RegistryError> + Send + Sync>;

/// Id-to-factory lookup table.
pub struct Registry<T: ?Sized> {
    entries: BTreeMap<String, (PluginInfo, Factory<T>)>,
}

/// Registry of bots.
pub type BotRegistry = Registry<dyn Bot>;

/// Registry of evaluators.
pub type EvaluatorRegistry = Registry<dyn Evaluator>;

impl<T: ?Sized> Registry<T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers a factory under `info.id`.
    #[instrument(skip(self, factory), fields(id = %info.id))]
    pub fn register<F>(&mut self, info: PluginInfo, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&PluginOptions) -> Result<Arc<T>, RegistryError> + Send + Sync + 'static,
    {
        if self.entries.contains_key(&info.id) {
            warn!("Duplicate plugin registration");
            return Err(RegistryError::DuplicatePlugin(info.id));
        }
        debug!("Plugin registered");
        self.entries.insert(info.id.clone(), (info, Arc::new(factory)));
        Ok(())
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Metadata for `id`.
    pub fn info(&self, id: &str) -> Option<&PluginInfo> {
        self.entries.get(id).map(|(info, _)| info)
    }

    /// Metadata for every plugin, ordered by id.
    pub fn list(&self) -> Vec<&PluginInfo> {
        self.entries.values().map(|(info, _)| info).collect()
    }

    /// Instantiates the plugin registered as `id`.
    #[instrument(skip(self, options))]
    pub fn create(&self, id: &str, options: &PluginOptions) -> Result<Arc<T>, RegistryError> {
        let (_, factory) = self
            .entries
            .get(id)
            .ok_or_else(|| RegistryError::UnknownPlugin(id.to_string()))?;
        factory(options)
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("plugins", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry<dyn Evaluator> {
    /// Registry with the built-in heuristic evaluator.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let registered = registry.register(HeuristicEvaluator::plugin_info(), |options| {
            Ok(Arc::new(HeuristicEvaluator::new(options.thresholds)) as Arc<dyn Evaluator>)
        });
        debug_assert!(registered.is_ok(), "built-in evaluator ids collide");
        registry
    }
}

impl Registry<dyn Bot> {
    /// Registry with the built-in bots: `random`, `greedy` and `heuristic`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let registered = [
            registry.register(RandomBot::plugin_info(), |options| {
                let bot = match options.seed {
                    Some(seed) => RandomBot::seeded(seed),
                    None => RandomBot::from_entropy(),
                };
                Ok(Arc::new(bot) as Arc<dyn Bot>)
            }),
            registry.register(GreedyBot::plugin_info(), |options| {
                Ok(Arc::new(GreedyBot::new(options.thresholds)) as Arc<dyn Bot>)
            }),
            registry.register(
                PluginInfo::new("heuristic", "Heuristic evaluator bot", 40, false),
                |options| {
                    let evaluator: Arc<dyn Evaluator> =
                        Arc::new(HeuristicEvaluator::new(options.thresholds));
                    Ok(Arc::new(EvaluatorBackedBot::new(
                        PluginInfo::new("heuristic", "Heuristic evaluator bot", 40, false),
                        evaluator,
                        options.timeout,
                        options.fallback,
                    )) as Arc<dyn Bot>)
                },
            ),
        ];
        debug_assert!(registered.iter().all(Result::is_ok), "built-in bot ids collide");
        registry
    }
}
