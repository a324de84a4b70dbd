//! Discovery and caching of the upstream model identifier.
//!
//! A [`ModelResolver`] is built once per process and shared. The first
//! successful discovery is memoized for its whole lifetime and never
//! invalidated; a failed discovery falls back to the configured default
//! without caching, so a later call may still discover.

use sommelier_core::Result;
use sommelier_core::SommelierError;
use sommelier_core::config::ModelSettings;
use sommelier_core::generation::{ModelCatalog, ModelDescriptor};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const GENERATE_METHOD: &str = "generateContent";

pub struct ModelResolver {
    catalog: Arc<dyn ModelCatalog>,
    settings: ModelSettings,
    resolved: OnceCell<String>,
}

impl ModelResolver {
    pub fn new(catalog: Arc<dyn ModelCatalog>, settings: ModelSettings) -> Self {
        Self {
            catalog,
            settings,
            resolved: OnceCell::new(),
        }
    }

    /// Returns the model to address, discovering it on first use.
    ///
    /// Never fails: listing errors yield `settings.default_model`.
    pub async fn resolve(&self) -> String {
        match self.resolved.get_or_try_init(|| self.discover()).await {
            Ok(model) => model.clone(),
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = %self.settings.default_model,
                    "Model discovery failed, using default model"
                );
                self.settings.default_model.clone()
            }
        }
    }

    /// The memoized model, if discovery has succeeded.
    pub fn cached(&self) -> Option<&str> {
        self.resolved.get().map(String::as_str)
    }

    async fn discover(&self) -> Result<String> {
        let models = self.catalog.list_models().await?;
        debug!(count = models.len(), "Listed upstream models");

        let model = select_model(&models, &self.settings).ok_or_else(|| {
            SommelierError::upstream(None, "Model listing contained no usable generation model")
        })?;
        info!(model = %model, "Resolved upstream model");
        Ok(model)
    }
}

/// Picks a model from a listing.
///
/// Candidates must support `generateContent` and follow the family naming
/// convention. Preferred fragments are tried in order; otherwise the first
/// candidate wins.
pub fn select_model(models: &[ModelDescriptor], settings: &ModelSettings) -> Option<String> {
    let candidates: Vec<&str> = models
        .iter()
        .filter(|m| m.supports(GENERATE_METHOD))
        .map(ModelDescriptor::model_id)
        .filter(|id| id.starts_with(&settings.family_prefix))
        .collect();

    settings
        .preferred
        .iter()
        .find_map(|fragment| candidates.iter().find(|id| id.contains(fragment.as_str())))
        .or_else(|| candidates.first())
        .map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn model(name: &str, methods: &[&str]) -> ModelDescriptor {
        ModelDescriptor {
            name: format!("models/{name}"),
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Serves scripted listings in order, counting calls.
    struct ScriptedCatalog {
        calls: AtomicUsize,
        replies: Mutex<Vec<Result<Vec<ModelDescriptor>>>>,
    }

    impl ScriptedCatalog {
        fn new(mut replies: Vec<Result<Vec<ModelDescriptor>>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                replies: Mutex::new(replies),
            })
        }
    }

    #[async_trait]
    impl ModelCatalog for ScriptedCatalog {
        async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(SommelierError::upstream(None, "script exhausted")))
        }
    }

    #[test]
    fn test_preference_order() {
        let settings = ModelSettings::default();
        let models = vec![
            model("gemini-1.5-pro", &["generateContent"]),
            model("gemini-2.0-flash", &["generateContent"]),
            model("gemini-2.5-flash", &["generateContent", "countTokens"]),
        ];
        assert_eq!(
            select_model(&models, &settings).as_deref(),
            Some("gemini-2.5-flash")
        );

        let no_flagship = &models[..2];
        assert_eq!(
            select_model(no_flagship, &settings).as_deref(),
            Some("gemini-2.0-flash")
        );

        assert_eq!(
            select_model(&models[..1], &settings).as_deref(),
            Some("gemini-1.5-pro")
        );
    }

    #[test]
    fn test_filters_methods_and_family() {
        let settings = ModelSettings::default();
        let models = vec![
            model("text-embedding-004", &["embedContent"]),
            model("gemini-2.5-flash", &["countTokens"]),
            model("imagen-3.0", &["generateContent"]),
            model("gemini-exp-1206", &["generateContent"]),
        ];
        // Only the last entry qualifies and it matches no preferred tier.
        assert_eq!(
            select_model(&models, &settings).as_deref(),
            Some("gemini-exp-1206")
        );
        assert_eq!(select_model(&models[..3], &settings), None);
    }

    #[tokio::test]
    async fn test_success_is_memoized() {
        let catalog = ScriptedCatalog::new(vec![Ok(vec![model(
            "gemini-2.5-flash",
            &["generateContent"],
        )])]);
        let resolver = ModelResolver::new(catalog.clone(), ModelSettings::default());

        assert_eq!(resolver.cached(), None);
        assert_eq!(resolver.resolve().await, "gemini-2.5-flash");
        assert_eq!(resolver.resolve().await, "gemini-2.5-flash");
        assert_eq!(resolver.cached(), Some("gemini-2.5-flash"));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_without_caching() {
        let catalog = ScriptedCatalog::new(vec![
            Err(SommelierError::upstream(Some(500), "boom")),
            Ok(vec![model("gemini-2.0-flash", &["generateContent"])]),
        ]);
        let resolver = ModelResolver::new(catalog.clone(), ModelSettings::default());

        assert_eq!(resolver.resolve().await, "gemini-2.5-flash");
        assert_eq!(resolver.cached(), None);

        assert_eq!(resolver.resolve().await, "gemini-2.0-flash");
        assert_eq!(resolver.resolve().await, "gemini-2.0-flash");
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_listing_uses_default() {
        let catalog = ScriptedCatalog::new(vec![Ok(vec![])]);
        let settings = ModelSettings {
            default_model: "gemini-fallback".to_string(),
            ..ModelSettings::default()
        };
        let resolver = ModelResolver::new(catalog, settings);
        assert_eq!(resolver.resolve().await, "gemini-fallback");
    }
}
