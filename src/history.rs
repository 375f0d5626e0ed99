//! Capped, persisted interaction history.
//!
//! Two independent logs: AI chat exchanges and saved dashboard configs. Both
//! are newest-first, bounded to 50 entries, and survive reloads through the
//! injected store. Operations return the new list as the caller's source of
//! truth; there is no implicit reactivity.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::{KvStore, CHAT_HISTORY_KEY, DASHBOARD_HISTORY_KEY};

/// Maximum entries retained per log.
pub const HISTORY_CAP: usize = 50;

/// A recorded AI chat exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub ai_error: Option<String>,
    #[serde(default)]
    pub chart_type: Option<String>,
}

/// A saved dashboard design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

/// A history entry: generated id + timestamp wrapping the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<T> {
    pub id: String,
    pub ts: i64,
    #[serde(flatten)]
    pub record: T,
}

/// Persisted history over the injected store.
pub struct HistoryStore {
    store: Arc<dyn KvStore>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn chat(&self) -> Vec<HistoryEntry<ChatRecord>> {
        self.read(CHAT_HISTORY_KEY)
    }

    pub fn add_chat(&self, record: ChatRecord) -> Vec<HistoryEntry<ChatRecord>> {
        self.prepend(CHAT_HISTORY_KEY, record)
    }

    pub fn clear_chat(&self) {
        self.store.set(CHAT_HISTORY_KEY, "[]");
    }

    pub fn dashboards(&self) -> Vec<HistoryEntry<DashboardRecord>> {
        self.read(DASHBOARD_HISTORY_KEY)
    }

    pub fn add_dashboard(&self, record: DashboardRecord) -> Vec<HistoryEntry<DashboardRecord>> {
        self.prepend(DASHBOARD_HISTORY_KEY, record)
    }

    pub fn remove_dashboard(&self, id: &str) -> Vec<HistoryEntry<DashboardRecord>> {
        let mut list = self.dashboards();
        list.retain(|entry| entry.id != id);
        self.write(DASHBOARD_HISTORY_KEY, &list);
        list
    }

    pub fn clear_dashboards(&self) {
        self.store.set(DASHBOARD_HISTORY_KEY, "[]");
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Vec<HistoryEntry<T>> {
        match self.store.get(key) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable history under {}: {}", key, e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    fn write<T: Serialize>(&self, key: &str, list: &[HistoryEntry<T>]) {
        match serde_json::to_string(list) {
            Ok(raw) => self.store.set(key, &raw),
            Err(e) => log::warn!("Failed to serialize history under {}: {}", key, e),
        }
    }

    fn prepend<T: Serialize + DeserializeOwned>(
        &self,
        key: &str,
        record: T,
    ) -> Vec<HistoryEntry<T>> {
        let mut list = self.read(key);
        list.insert(
            0,
            HistoryEntry {
                id: uuid::Uuid::new_v4().to_string(),
                ts: chrono::Utc::now().timestamp_millis(),
                record,
            },
        );
        list.truncate(HISTORY_CAP);
        self.write(key, &list);
        list
    }
}
