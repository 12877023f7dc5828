//! Key-value persistence for UI state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{Error, Result};

/// File name of the preferences file inside the config directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Backend that stores one JSON value per store ID.
pub trait KeyValueStore: Send + Sync {
    /// Loads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, key: &str, value: Value) -> Result<()>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory backend, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values().get(key).cloned())
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        self.values().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values().remove(key);
        Ok(())
    }
}

/// JSON file backend: one object keyed by store ID.
///
/// Every write rewrites the whole file. Writes from one process are
/// serialized.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by the file at `path`.
    ///
    /// The file and its parent directories are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store at `<config dir>/mailfang/preferences.json`.
    #[must_use]
    pub fn in_config_dir() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailfang")
            .join(PREFERENCES_FILE);
        Self::new(path)
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::CorruptPreferences(self.path.display().to_string())),
        }
    }

    fn write_all(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&Value::Object(map))?;
        std::fs::write(&self.path, contents)?;
        debug!(path = %self.path.display(), "preferences saved");
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut map = match self.read_all() {
            Ok(map) => map,
            Err(Error::CorruptPreferences(_) | Error::Serde(_)) => {
                info!(path = %self.path.display(), "replacing unreadable preferences file");
                Map::new()
            }
            Err(e) => return Err(e),
        };
        f(&mut map);
        self.write_all(map)
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: Value) -> Result<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.modify(|map| {
            map.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("mailfang-core-{}-{name}", std::process::id()))
            .join(PREFERENCES_FILE)
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.load("search").unwrap(), None);

        store.save("search", json!({"query": "x"})).unwrap();
        assert_eq!(store.load("search").unwrap(), Some(json!({"query": "x"})));

        store.remove("search").unwrap();
        assert_eq!(store.load("search").unwrap(), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let path = temp_path("roundtrip");
        let _ = std::fs::remove_file(&path);
        let store = FileStore::new(&path);

        assert_eq!(store.load("mailLayout").unwrap(), None);
        store.save("mailLayout", json!({"inboxWidth": 400})).unwrap();
        store.save("search", json!({"query": "hi"})).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.load("mailLayout").unwrap(),
            Some(json!({"inboxWidth": 400}))
        );
        assert_eq!(reopened.load("search").unwrap(), Some(json!({"query": "hi"})));

        reopened.remove("search").unwrap();
        assert_eq!(store.load("search").unwrap(), None);
        assert!(store.load("mailLayout").unwrap().is_some());

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let store = FileStore::new(&path);

        assert!(matches!(
            store.load("search"),
            Err(Error::CorruptPreferences(_))
        ));

        // A write replaces the unreadable file.
        store.save("search", json!({"query": ""})).unwrap();
        assert_eq!(store.load("search").unwrap(), Some(json!({"query": ""})));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_in_config_dir_path() {
        let store = FileStore::in_config_dir();
        assert!(store.path().ends_with("mailfang/preferences.json"));
    }
}
