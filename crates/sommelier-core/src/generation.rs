//! Ports to the upstream generation service.
//!
//! Implemented over HTTP by `sommelier-interaction`; tests substitute
//! in-process doubles.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single-prompt generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Instruction block followed by the shopper's question.
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Text-completion backend addressed by model identifier.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issues exactly one call and returns the first text part of the reply.
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<String>;
}

/// One entry of the provider's model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Provider name, e.g. `models/gemini-2.5-flash`.
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelDescriptor {
    /// Name without the `models/` resource prefix.
    pub fn model_id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }
}

/// Source of available model descriptors.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;
}
