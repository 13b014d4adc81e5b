//! gnubg process configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable naming the gnubg executable.
pub const ENV_EXECUTABLE: &str = "GNUBG_EXECUTABLE";
/// Environment variable with the per-call timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "GNUBG_TIMEOUT_MS";
/// Environment variable with the search depth.
pub const ENV_PLIES: &str = "GNUBG_PLIES";
/// Environment variable enabling command/output logging.
pub const ENV_VERBOSE: &str = "GNUBG_VERBOSE";

/// How to run gnubg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct GnubgConfig {
    /// Executable name or path.
    #[setters(into)]
    executable: String,
    /// Upper bound on one gnubg invocation.
    timeout_ms: u64,
    /// Evaluation depth for chequer play and cube decisions.
    plies: u8,
    /// Log full command scripts and raw output.
    verbose: bool,
}

impl Default for GnubgConfig {
    fn default() -> Self {
        Self {
            executable: "gnubg".to_string(),
            timeout_ms: 30_000,
            plies: 2,
            verbose: false,
        }
    }
}

impl GnubgConfig {
    /// Defaults overridden by the `GNUBG_*` environment variables.
    #[instrument]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_vars(|key| std::env::var(key).ok())
    }

    /// Loads a TOML file; missing keys keep their defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read gnubg config: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse gnubg config: {}", e)))?;
        info!(executable = %config.executable, plies = config.plies, "gnubg config loaded");
        Ok(config)
    }

    /// Overrides fields from `lookup`, which maps variable names to values.
    pub fn merge_vars(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(executable) = lookup(ENV_EXECUTABLE) {
            debug!(%executable, "Executable from environment");
            self.executable = executable;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigError::new(format!("{} must be milliseconds, got '{}'", ENV_TIMEOUT_MS, raw))
            })?;
        }
        if let Some(raw) = lookup(ENV_PLIES) {
            self.plies = raw.trim().parse().map_err(|_| {
                ConfigError::new(format!("{} must be a ply count, got '{}'", ENV_PLIES, raw))
            })?;
        }
        if let Some(raw) = lookup(ENV_VERBOSE) {
            self.verbose = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(self)
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            (ENV_EXECUTABLE, "/opt/gnubg/bin/gnubg"),
            (ENV_PLIES, "3"),
            (ENV_VERBOSE, "yes"),
        ]
        .into_iter()
        .collect();
        let config = GnubgConfig::default()
            .merge_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.executable(), "/opt/gnubg/bin/gnubg");
        assert_eq!(*config.plies(), 3);
        assert_eq!(*config.timeout_ms(), 30_000);
        assert!(*config.verbose());
    }

    #[test]
    fn test_bad_timeout_reports_variable() {
        let err = GnubgConfig::default()
            .merge_vars(|key| (key == ENV_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.message.contains(ENV_TIMEOUT_MS));
        assert!(err.file.ends_with("config.rs"));
    }

    #[test]
    fn test_partial_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnubg.toml");
        std::fs::write(&path, "plies = 0\ntimeout_ms = 5000\n").unwrap();
        let config = GnubgConfig::from_file(&path).unwrap();
        assert_eq!(config, GnubgConfig::default().with_plies(0).with_timeout_ms(5000));
    }
}
