//! Storage layer for atomic file operations.

mod atomic_json;
mod file_key_value_store;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};
pub use file_key_value_store::FileKeyValueStore;
