//! Bot preset configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strictly_backgammon::{Bot, BotRegistry, CubeThresholds, FallbackPolicy, PluginOptions};
use tracing::{debug, info, instrument};

/// A named bot preset loaded from TOML.
///
/// ```toml
/// name = "Careful heuristic"
/// bot = "heuristic"
/// timeout_ms = 2000
/// fallback = "first_legal"
/// take_point = 0.22
/// ```
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct BotConfig {
    /// Preset name shown to users.
    name: String,

    /// Registry id of the bot to build.
    bot: String,

    /// Seed for bots that use randomness.
    #[serde(default)]
    seed: Option<u64>,

    /// Time budget for one decision.
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,

    /// What to do when the evaluator fails.
    #[serde(default)]
    fallback: FallbackPolicy,

    /// Minimum winning chance for taking a double.
    #[serde(default)]
    take_point: Option<f64>,

    /// Minimum winning chance for offering a double.
    #[serde(default)]
    double_point: Option<f64>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl BotConfig {
    /// A preset for registry id `bot` with default options.
    pub fn new(name: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bot: bot.into(),
            seed: None,
            timeout_ms: default_timeout_ms(),
            fallback: FallbackPolicy::default(),
            take_point: None,
            double_point: None,
        }
    }

    /// Loads a preset from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading bot preset");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        info!(name = %config.name, bot = %config.bot, "Bot preset loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("take_point", self.take_point), ("double_point", self.double_point)] {
            if let Some(v) = value
                && !(0.0..=1.0).contains(&v)
            {
                return Err(ConfigError::new(format!("{} must be within 0..=1, got {}", key, v)));
            }
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::new("timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Factory options for this preset.
    pub fn plugin_options(&self) -> PluginOptions {
        let defaults = CubeThresholds::default();
        PluginOptions {
            seed: self.seed,
            timeout: Duration::from_millis(self.timeout_ms),
            fallback: self.fallback,
            thresholds: CubeThresholds {
                take_point: self.take_point.unwrap_or(defaults.take_point),
                double_point: self.double_point.unwrap_or(defaults.double_point),
            },
        }
    }

    /// Builds the bot from `registry`.
    #[instrument(skip(self, registry), fields(name = %self.name, bot = %self.bot))]
    pub fn build(&self, registry: &BotRegistry) -> Result<Arc<dyn Bot>, ConfigError> {
        registry
            .create(&self.bot, &self.plugin_options())
            .map_err(|e| ConfigError::new(format!("Preset '{}': {}", self.name, e)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
