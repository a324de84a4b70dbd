//! JSON-file backed [`KeyValueStore`].

use super::atomic_json::{AtomicJsonError, AtomicJsonFile};
use crate::paths::SommelierPaths;
use sommelier_core::Result;
use sommelier_core::storage::KeyValueStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

type Entries = BTreeMap<String, String>;

/// Persists string entries in one JSON object on disk.
///
/// Each `set`/`remove` is a locked read-modify-write of the whole file, so
/// writes to different keys never clobber each other. Sequences of
/// operations are not transactional.
pub struct FileKeyValueStore {
    file: AtomicJsonFile<Entries>,
}

impl FileKeyValueStore {
    /// Creates a store at the default location (`~/.local/share/sommelier/storage.json`).
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(SommelierPaths::storage_file()?))
    }

    /// Creates a store at a custom path (for testing or `--storage`).
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: Fn(&mut Entries),
    {
        match self.file.update(Entries::new(), &f) {
            Err(AtomicJsonError::JsonError(err)) => {
                warn!(
                    path = %self.file.path().display(),
                    error = %err,
                    "Storage file is corrupt, starting over"
                );
                let mut entries = Entries::new();
                f(&mut entries);
                self.file.save(&entries).map_err(Into::into)
            }
            other => other.map_err(Into::into),
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.file.load()?;
        Ok(entries.and_then(|mut map| map.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");

        let store = FileKeyValueStore::with_path(path.clone());
        store.set("quota", "blob").unwrap();
        store.set("fingerprint", "fp_1").unwrap();
        drop(store);

        let reopened = FileKeyValueStore::with_path(path);
        assert_eq!(reopened.get("quota").unwrap().as_deref(), Some("blob"));
        assert_eq!(reopened.get("fingerprint").unwrap().as_deref(), Some("fp_1"));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn test_remove_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::with_path(temp_dir.path().join("storage.json"));

        store.set("a", "1").unwrap();
        store.remove("a").unwrap();
        store.remove("never-set").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_reads_as_error_and_is_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        fs::write(&path, "garbage").unwrap();

        let store = FileKeyValueStore::with_path(path);
        assert!(store.get("a").is_err());

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
