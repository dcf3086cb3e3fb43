//! Durable key-value store abstraction
//!
//! The session persists through an opaque get/set/remove store. Writes are
//! best-effort: a failed write reports `false` and the caller carries on with
//! its in-memory state.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Storage keys. The names match existing user data on disk.
pub mod keys {
    pub const TABS: &str = "browser_saved_tabs_list";
    pub const ACTIVE_TAB: &str = "browser_last_active_tab_id";
    pub const BOOKMARKS: &str = "saved_websites";
    pub const HISTORY: &str = "browser_history_data";
    pub const SEARCH_HISTORY: &str = "user_search_history";
    pub const DARK_MODE: &str = "browser_forced_dark_mode_key";
    pub const DESKTOP_MODE: &str = "browser_desktop_mode";
    pub const SEARCH_ENGINE: &str = "browser_search_engine";
    pub const SCRIPTS: &str = "user_custom_scripts";
    pub const BLOCK_RULES: &str = "user_custom_block_rules";
    pub const BLOCKED_DOMAINS: &str = "user_blocked_domains";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed store document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Opaque durable store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;

    /// Returns `false` if the value could not be persisted.
    fn set(&mut self, key: &str, value: Value) -> bool;

    /// Returns `false` if the removal could not be persisted.
    fn remove(&mut self, key: &str) -> bool;
}

/// Read and decode a value. Missing keys and undecodable values read as `None`.
pub fn load<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("ignoring undecodable value under {key}: {e}");
            None
        }
    }
}

/// Encode and write a value.
pub fn save<T: Serialize + ?Sized>(store: &mut impl KeyValueStore, key: &str, value: &T) -> bool {
    match serde_json::to_value(value) {
        Ok(encoded) => store.set(key, encoded),
        Err(e) => {
            log::warn!("could not encode value for {key}: {e}");
            false
        }
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Volatile store; also counts writes so callers can observe persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set`/`remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        self.entries.insert(key.to_string(), value);
        self.writes += 1;
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key);
        self.writes += 1;
        true
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Store backed by one JSON document on disk.
///
/// The whole document is rewritten on every mutation through a temporary
/// file and a rename, so a crash never leaves a half-written document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl FileStore {
    /// Open the document at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        log::debug!("opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let text = serde_json::to_string_pretty(&self.entries).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn flush_logged(&self) -> bool {
        match self.flush() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("persistence failed: {e}");
                false
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        self.entries.insert(key.to_string(), value);
        self.flush_logged()
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_none() {
            return true;
        }
        self.flush_logged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pw-store-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("store.json")
    }

    #[test]
    fn memory_store_counts_writes() {
        let mut store = MemoryStore::new();
        assert!(store.set("a", json!(1)));
        assert!(store.remove("a"));
        assert_eq!(store.write_count(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn typed_load_and_save() {
        let mut store = MemoryStore::new();
        assert!(save(&mut store, "list", &vec!["x", "y"]));
        let list: Option<Vec<String>> = load(&store, "list");
        assert_eq!(list, Some(vec!["x".to_string(), "y".to_string()]));

        store.set("bad", json!("not a list"));
        let bad: Option<Vec<String>> = load(&store, "bad");
        assert_eq!(bad, None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_path("reopen");
        {
            let mut store = FileStore::open(&path).unwrap();
            assert!(store.set(keys::DARK_MODE, json!(true)));
            assert!(store.set(keys::SEARCH_ENGINE, json!("bing")));
            assert!(store.remove(keys::SEARCH_ENGINE));
        }
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(keys::DARK_MODE), Some(json!(true)));
        assert_eq!(store.get(keys::SEARCH_ENGINE), None);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_store_rejects_malformed_document() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(FileStore::open(&path), Err(StoreError::Json { .. })));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
