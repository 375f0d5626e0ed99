//! Durable client storage behind an injected capability.
//!
//! The UI shell owns a handful of keyed strings (credential, theme, history,
//! the auto-load handoff flag). `FileStore` keeps them in a single JSON map
//! file with read-modify-write semantics; tests substitute `MemoryStore`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

pub const API_TOKEN_KEY: &str = "api_token";
pub const THEME_KEY: &str = "theme";
pub const CHAT_HISTORY_KEY: &str = "ai_chat_history_v1";
pub const DASHBOARD_HISTORY_KEY: &str = "ai_dashboard_history_v1";
pub const AUTO_LOAD_KEY: &str = "allow_auto_load";

/// Keyed string storage. Writes are last-write-wins; callers re-read returned
/// values as the source of truth rather than expecting reactivity.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.map.lock().remove(key);
    }
}

/// JSON-file-backed store. The whole map is rewritten on every change;
/// single-threaded callers make that safe without further discipline.
pub struct FileStore {
    path: PathBuf,
    map: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store file inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, String> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| format!("Failed to create store dir: {}", e))?;
        }
        let path = dir.join("client_store.json");
        let map = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read store: {}", e))?;
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse store: {}", e))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    /// Open the store in the default location (`~/.bizboard/`).
    pub fn open_default() -> Result<Self, String> {
        let home = dirs::home_dir().ok_or("Could not find home directory")?;
        Self::open(&home.join(".bizboard"))
    }

    fn flush(&self, map: &HashMap<String, String>) {
        match serde_json::to_string_pretty(map) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    log::warn!("Failed to persist client store: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize client store: {}", e),
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut map = self.map.lock();
        map.insert(key.to_string(), value.to_string());
        self.flush(&map);
    }

    fn remove(&self, key: &str) {
        let mut map = self.map.lock();
        if map.remove(key).is_some() {
            self.flush(&map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get(THEME_KEY).is_none());
        store.set(THEME_KEY, "dark");
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        store.remove(THEME_KEY);
        assert!(store.get(THEME_KEY).is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set(API_TOKEN_KEY, "abc123");
            store.set(AUTO_LOAD_KEY, "1");
        }
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(API_TOKEN_KEY).as_deref(), Some("abc123"));
        assert_eq!(reopened.get(AUTO_LOAD_KEY).as_deref(), Some("1"));
        reopened.remove(AUTO_LOAD_KEY);

        let again = FileStore::open(dir.path()).unwrap();
        assert!(again.get(AUTO_LOAD_KEY).is_none());
    }

    #[test]
    fn test_file_store_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set(THEME_KEY, "light");
        store.set(THEME_KEY, "dark");
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
    }
}
