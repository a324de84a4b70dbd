//! Configuration model for the sommelier pipeline.
//!
//! Every section carries `#[serde(default)]` so a partial `config.toml`
//! only overrides the keys it names.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure for config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SommelierConfig {
    pub quota: QuotaSettings,
    pub validation: ValidationSettings,
    pub dispatch: DispatchSettings,
    pub model: ModelSettings,
    /// Timeout applied to every upstream HTTP call.
    pub request_timeout_secs: u64,
}

impl Default for SommelierConfig {
    fn default() -> Self {
        Self {
            quota: QuotaSettings::default(),
            validation: ValidationSettings::default(),
            dispatch: DispatchSettings::default(),
            model: ModelSettings::default(),
            request_timeout_secs: 30,
        }
    }
}

impl SommelierConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// "At most `limit` uses per `window_secs`" per fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaSettings {
    pub limit: u32,
    pub window_secs: u64,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            limit: 7,
            window_secs: 3 * 60 * 60,
        }
    }
}

impl QuotaSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Minimum trimmed length, in characters.
    pub min_length: usize,
    /// Maximum trimmed length, in characters.
    pub max_length: usize,
    /// Longest tolerated run of one repeated character.
    pub max_repeated_chars: usize,
    /// Most pictographic code points tolerated in one message.
    pub max_emoji: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 500,
            max_repeated_chars: 10,
            max_emoji: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Number of trailing conversation turns embedded as context.
    pub history_turns: usize,
    /// Character budget for each product description in the digest.
    pub description_budget: usize,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            history_turns: 3,
            description_budget: 120,
            temperature: 0.3,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    /// Used whenever model listing fails or yields no usable model.
    pub default_model: String,
    /// Name fragments tried in order: flagship-fast, fast, general-purpose.
    pub preferred: Vec<String>,
    /// Naming convention a listed model must follow to be considered.
    pub family_prefix: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
            preferred: vec![
                "gemini-2.5-flash".to_string(),
                "flash".to_string(),
                "pro".to_string(),
            ],
            family_prefix: "gemini-".to_string(),
        }
    }
}

/// Root structure for secret.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiSecret>,
}

/// Gemini API credentials
#[derive(Clone, Deserialize)]
pub struct GeminiSecret {
    pub api_key: String,
}

impl std::fmt::Debug for GeminiSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSecret")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SommelierConfig = toml::from_str(
            r#"
            [quota]
            limit = 3

            [dispatch]
            history_turns = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.quota.limit, 3);
        assert_eq!(config.quota.window_secs, 10_800);
        assert_eq!(config.dispatch.history_turns, 5);
        assert_eq!(config.dispatch.max_output_tokens, 1024);
        assert_eq!(config.model.default_model, "gemini-2.5-flash");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret: SecretConfig =
            serde_json::from_str(r#"{"gemini": {"api_key": "AIza-very-secret"}}"#).unwrap();
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("AIza-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
