//! Key/value backends for device-local data.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::{Error, Result};

/// Synchronous string key/value storage holding buckets and sync state.
pub trait LocalStore: Send + Sync {
    /// Read a value, `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry.
    pub fn entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(lock(&self.values)?.clone())
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.values)?.remove(key);
        Ok(())
    }
}

/// Store persisted as one pretty-printed JSON object.
///
/// Nothing is cached: every read loads the file and every mutation is a
/// read-modify-write, so other handles on the same path stay visible.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            guard: Mutex::new(()),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => return Err(error.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|error| {
            Error::Storage(format!(
                "Failed to parse local store at {}: {error}",
                self.path.display()
            ))
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = lock(&self.guard)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = lock(&self.guard)?;
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = lock(&self.guard)?;
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

impl<T: LocalStore + ?Sized> LocalStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Storage("local store lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("notes").unwrap(), None);

        store.set("notes", "[]").unwrap();
        assert_eq!(store.get("notes").unwrap().as_deref(), Some("[]"));

        store.remove("notes").unwrap();
        store.remove("notes").unwrap();
        assert_eq!(store.get("notes").unwrap(), None);
    }

    #[test]
    fn json_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("expenses", r#"[{"id":"e1"}]"#).unwrap();
        store.set("settings", "{}").unwrap();
        store.remove("settings").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("expenses").unwrap().as_deref(),
            Some(r#"[{"id":"e1"}]"#)
        );
        assert_eq!(reopened.get("settings").unwrap(), None);
    }

    #[test]
    fn json_file_store_sees_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let watcher = JsonFileStore::open(&path).unwrap();
        watcher.set("sync.last_sync_at", "2024-09-01T10:00:00Z").unwrap();

        let editor = JsonFileStore::open(&path).unwrap();
        editor.set("expenses", r#"[{"id":"e1"}]"#).unwrap();

        assert_eq!(
            watcher.get("expenses").unwrap().as_deref(),
            Some(r#"[{"id":"e1"}]"#)
        );
        watcher.set("sync.last_sync_at", "2024-09-01T11:00:00Z").unwrap();
        assert_eq!(
            editor.get("expenses").unwrap().as_deref(),
            Some(r#"[{"id":"e1"}]"#)
        );

        editor.remove("expenses").unwrap();
        assert_eq!(watcher.get("expenses").unwrap(), None);
        assert_eq!(
            watcher.get("sync.last_sync_at").unwrap().as_deref(),
            Some("2024-09-01T11:00:00Z")
        );
    }

    #[test]
    fn json_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        match err {
            Error::Storage(message) => assert!(message.contains("store.json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
