//! Upstream-facing adapters: the Gemini REST client and the model resolver.

pub mod gemini_api_client;
pub mod model_resolver;

pub use gemini_api_client::GeminiApiClient;
pub use model_resolver::ModelResolver;
