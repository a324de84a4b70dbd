//! Loading of config.toml into [`SommelierConfig`].

use crate::paths::SommelierPaths;
use sommelier_core::config::SommelierConfig;
use sommelier_core::{Result, SommelierError};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Read-only access to `~/.config/sommelier/config.toml`.
///
/// A missing file yields [`SommelierConfig::default`]; a file that exists
/// but does not parse is a configuration error rather than a silent reset.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Creates a ConfigStorage with the default path.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(SommelierPaths::config_file()?))
    }

    /// Creates a ConfigStorage with a custom path (for testing or `--config`).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<SommelierConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(SommelierConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            SommelierError::config(format!(
                "Failed to parse configuration file at {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
