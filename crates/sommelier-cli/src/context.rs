//! Wiring of configuration, storage and upstream clients for the CLI.

use anyhow::{Context, Result};
use sommelier_application::SommelierService;
use sommelier_core::clock::SystemClock;
use sommelier_core::config::SommelierConfig;
use sommelier_core::fingerprint::current_fingerprint;
use sommelier_core::quota::QuotaStore;
use sommelier_core::storage::KeyValueStore;
use sommelier_infrastructure::{ConfigStorage, FileKeyValueStore, SecretStorage};
use sommelier_interaction::{GeminiApiClient, ModelResolver};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct AppContext {
    pub config: SommelierConfig,
    store: Arc<dyn KeyValueStore>,
    fingerprint: String,
}

impl AppContext {
    pub fn load(config_path: Option<PathBuf>, storage_path: Option<PathBuf>) -> Result<Self> {
        let config_storage = match config_path {
            Some(path) => ConfigStorage::with_path(path),
            None => ConfigStorage::new()?,
        };
        let config = config_storage.load()?;

        let store = match storage_path {
            Some(path) => FileKeyValueStore::with_path(path),
            None => FileKeyValueStore::new()?,
        };
        debug!(
            config = %config_storage.path().display(),
            storage = %store.path().display(),
            "Loaded CLI context"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
            fingerprint: current_fingerprint(),
        })
    }

    pub fn quota_store(&self) -> QuotaStore {
        QuotaStore::new(
            self.store.clone(),
            Arc::new(SystemClock),
            self.fingerprint.clone(),
            self.config.quota.clone(),
        )
    }

    pub fn gemini_client(&self) -> Result<Arc<GeminiApiClient>> {
        let api_key = SecretStorage::new()?
            .api_key()
            .context("Gemini API key is required for this command")?;
        let client = GeminiApiClient::new(
            api_key,
            self.config.model.base_url.clone(),
            self.config.request_timeout(),
        )?;
        Ok(Arc::new(client))
    }

    pub fn model_resolver(&self, client: Arc<GeminiApiClient>) -> Arc<ModelResolver> {
        Arc::new(ModelResolver::new(client, self.config.model.clone()))
    }

    pub fn service(&self) -> Result<SommelierService> {
        let client = self.gemini_client()?;
        let resolver = self.model_resolver(client.clone());
        let service = SommelierService::from_config(
            &self.config,
            self.store.clone(),
            Arc::new(SystemClock),
            self.fingerprint.clone(),
            client,
            resolver,
        )?;
        Ok(service)
    }
}
