//! Unified path management for sommelier configuration and state files.
//!
//! ```text
//! ~/.config/sommelier/          # Config directory
//! ├── config.toml               # Pipeline configuration
//! └── secret.json               # API keys
//!
//! ~/.local/share/sommelier/     # Data directory
//! └── storage.json              # Key-value store (quota record, fingerprint)
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "sommelier";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for sommelier_core::SommelierError {
    fn from(err: PathError) -> Self {
        sommelier_core::SommelierError::config(err.to_string())
    }
}

/// Platform-appropriate locations (XDG on Linux, native elsewhere).
pub struct SommelierPaths;

impl SommelierPaths {
    /// Returns the sommelier configuration directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the sommelier data directory.
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the path to the persistent key-value store.
    pub fn storage_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("storage.json"))
    }
}
