//! Secret configuration loading.
//!
//! The Gemini API key comes from `GEMINI_API_KEY` when set, otherwise from
//! `~/.config/sommelier/secret.json`:
//!
//! ```json
//! { "gemini": { "api_key": "..." } }
//! ```

use crate::paths::SommelierPaths;
use sommelier_core::config::SecretConfig;
use sommelier_core::{Result, SommelierError};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Read-only storage for secret.json.
///
/// Secrets are never included in error messages.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a SecretStorage with the default path.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(SommelierPaths::secret_file()?))
    }

    /// Creates a SecretStorage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads and parses secret.json.
    pub fn load(&self) -> Result<SecretConfig> {
        if !self.path.exists() {
            return Err(SommelierError::config(format!(
                "Secret file not found at: {}",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| {
            SommelierError::config(format!(
                "Failed to parse secret file at {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Resolves the API key, preferring the environment over the file.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
            return Ok(key);
        }
        self.api_key_from_file()
    }

    fn api_key_from_file(&self) -> Result<String> {
        self.load()?
            .gemini
            .map(|gemini| gemini.api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                SommelierError::config(format!(
                    "No Gemini API key: set {API_KEY_ENV} or add gemini.api_key to {}",
                    self.path.display()
                ))
            })
    }
}
