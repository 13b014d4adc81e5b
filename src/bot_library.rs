//! Bot preset library: scans a config directory for bot `.toml` files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::{BotConfig, ConfigError};

/// Environment variable overriding the preset directory.
pub const BOTS_DIR_ENV: &str = "STRICTLY_GAMMON_BOTS";

/// A scanned collection of bot presets.
#[derive(Debug, Clone)]
pub struct BotLibrary {
    presets: Vec<BotConfig>,
}

impl BotLibrary {
    /// Scans `dir_path` for `*.toml` files and loads each as a [`BotConfig`].
    ///
    /// Invalid files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the path is missing, is not a directory,
    /// cannot be read, or yields no valid presets.
    #[instrument(skip(dir_path), fields(path = %dir_path.as_ref().display()))]
    pub fn scan(dir_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir_path.as_ref();
        if !path.is_dir() {
            return Err(ConfigError::new(format!(
                "Bot preset directory not found: {}",
                path.display()
            )));
        }

        let entries = std::fs::read_dir(path).map_err(|e| {
            ConfigError::new(format!("Failed to read directory {}: {}", path.display(), e))
        })?;

        let mut presets = Vec::new();
        for entry_result in entries {
            let entry = entry_result
                .map_err(|e| ConfigError::new(format!("Failed to read directory entry: {}", e)))?;
            let entry_path = entry.path();

            if !entry_path.is_file()
                || entry_path.extension().and_then(|s| s.to_str()) != Some("toml")
            {
                debug!(path = %entry_path.display(), "Skipping non-TOML entry");
                continue;
            }

            match BotConfig::from_file(&entry_path) {
                Ok(config) => presets.push(config),
                Err(e) => {
                    warn!(path = %entry_path.display(), error = %e, "Skipping invalid bot preset");
                }
            }
        }

        if presets.is_empty() {
            return Err(ConfigError::new(format!(
                "No valid bot presets found in: {}",
                path.display()
            )));
        }

        presets.sort_by(|a, b| a.name().cmp(b.name()));
        info!(count = presets.len(), "Bot library loaded");
        Ok(Self { presets })
    }

    /// Scans the default preset directory.
    ///
    /// Resolution order:
    /// 1. `$STRICTLY_GAMMON_BOTS`
    /// 2. `$XDG_CONFIG_HOME/strictly_gammon/bots`
    /// 3. `./bots`
    #[instrument]
    pub fn scan_default() -> Result<Self, ConfigError> {
        Self::scan(Self::default_config_dir())
    }

    /// The directory [`BotLibrary::scan_default`] reads.
    pub fn default_config_dir() -> PathBuf {
        Self::resolve_dir(|key| std::env::var(key).ok())
    }

    fn resolve_dir(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(dir) = lookup(BOTS_DIR_ENV) {
            debug!(path = %dir, "Using {} env var", BOTS_DIR_ENV);
            return PathBuf::from(dir);
        }
        if let Some(xdg) = lookup("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("strictly_gammon").join("bots");
        }
        PathBuf::from("bots")
    }

    /// All presets, sorted by name.
    pub fn presets(&self) -> &[BotConfig] {
        &self.presets
    }

    /// Looks up a preset by exact name.
    pub fn get_by_name(&self, name: &str) -> Option<&BotConfig> {
        self.presets.iter().find(|preset| preset.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_sorts_and_skips_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.toml"), "name = \"Zed\"\nbot = \"random\"\n").unwrap();
        fs::write(dir.path().join("a.toml"), "name = \"Alpha\"\nbot = \"greedy\"\n").unwrap();
        fs::write(dir.path().join("broken.toml"), "name = ").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = BotLibrary::scan(dir.path()).unwrap();
        let names: Vec<&str> = library.presets().iter().map(|p| p.name().as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zed"]);
        assert_eq!(library.get_by_name("Zed").unwrap().bot(), "random");
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BotLibrary::scan(dir.path()).is_err());
        assert!(BotLibrary::scan(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_directory_resolution_order() {
        let env = |key: &str| match key {
            BOTS_DIR_ENV => Some("/srv/bots".to_string()),
            "XDG_CONFIG_HOME" => Some("/home/me/.config".to_string()),
            _ => None,
        };
        assert_eq!(BotLibrary::resolve_dir(env), PathBuf::from("/srv/bots"));
        let xdg_only = |key: &str| (key == "XDG_CONFIG_HOME").then(|| "/cfg".to_string());
        assert_eq!(BotLibrary::resolve_dir(xdg_only), PathBuf::from("/cfg/strictly_gammon/bots"));
        assert_eq!(BotLibrary::resolve_dir(|_| None), PathBuf::from("bots"));
    }
}
