//! File-backed key/value store
//!
//! The terminal client's stand-in for browser local storage: a flat JSON
//! object in `<data_dir>/storage.json`, rewritten on every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ClientError, ClientResult};
use crate::session::KeyValueStore;

const STORAGE_FILE: &str = "storage.json";

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store inside `data_dir`.
    ///
    /// An unreadable or corrupt file starts the store empty.
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(STORAGE_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable storage file {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ClientError::Storage(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(storage_err)?;
        std::fs::rename(&tmp, &self.path).map_err(storage_err)?;
        Ok(())
    }

    /// Apply a change, keeping it in memory only once it is on disk
    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> ClientResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let mut next = entries.clone();
        apply(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

fn storage_err(e: std::io::Error) -> ClientError {
    ClientError::Storage(e.to_string())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, TOKEN_KEY};

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("lifebull");

        {
            let store = FileStore::open(&nested);
            store.set(TOKEN_KEY, "tok-1").unwrap();
            store.set("life_bull_display_name", "张三").unwrap();
        }

        let store = FileStore::open(&nested);
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("tok-1"));
        assert_eq!(store.get("life_bull_display_name").as_deref(), Some("张三"));
        assert!(store.path().ends_with("storage.json"));
    }

    #[test]
    fn test_logout_removes_token_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(FileStore::open(dir.path()));
        session.set_token(Some("abc")).unwrap();
        session.set_token(None).unwrap();

        let reopened = FileStore::open(dir.path());
        assert_eq!(reopened.get(TOKEN_KEY), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STORAGE_FILE), "not json").unwrap();

        let store = FileStore::open(dir.path());
        assert_eq!(store.get(TOKEN_KEY), None);
        store.set(TOKEN_KEY, "fresh").unwrap();
        assert_eq!(FileStore::open(dir.path()).get(TOKEN_KEY).as_deref(), Some("fresh"));
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path());
        store.set(TOKEN_KEY, "kept").unwrap();

        // A directory in place of the file makes the rename fail
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();
        std::fs::write(store.path().join("blocker"), "x").unwrap();

        assert!(store.set(TOKEN_KEY, "lost").is_err());
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("kept"));
        assert!(store.remove(TOKEN_KEY).is_err());
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("kept"));
    }
}
