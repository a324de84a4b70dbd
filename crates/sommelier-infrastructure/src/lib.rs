//! Filesystem adapters for the sommelier pipeline.

pub mod config_storage;
pub mod paths;
pub mod secret_storage;
pub mod storage;

pub use crate::config_storage::ConfigStorage;
pub use crate::paths::SommelierPaths;
pub use crate::secret_storage::SecretStorage;
pub use crate::storage::FileKeyValueStore;
