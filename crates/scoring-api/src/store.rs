//! Key/value store used by the scoring functions.
//!
//! The [`Store`] trait has two faces: a persistent lookup ([`Store::get`])
//! whose failures are reported, and a best-effort cache whose failures are
//! swallowed by the implementation.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Backing key/value store.
pub trait Store: Send + Sync {
    /// Reads a persistent value.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Reads a cached value; `None` on miss, expiry or failure.
    fn cache_get(&self, key: &str) -> Option<String>;

    /// Caches a value for `ttl`; failures are ignored.
    fn cache_set(&self, key: &str, value: &str, ttl: Duration);
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process store backed by a `HashMap` behind a read/write lock.
///
/// Persistent values never expire. Cached values expire after their TTL; an
/// expired entry is dropped when it is read or on the next cache write.
///
/// # Example
///
/// ```
/// use scoring_api::{MemoryStore, Store};
/// use std::time::Duration;
///
/// let store = MemoryStore::new();
/// store.insert("i:1", r#"["books"]"#);
/// assert_eq!(store.get("i:1").unwrap().as_deref(), Some(r#"["books"]"#));
///
/// store.cache_set("uid:x", "3.0", Duration::from_secs(60));
/// assert_eq!(store.cache_get("uid:x").as_deref(), Some("3.0"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a JSON object.
    ///
    /// String values are stored as-is; any other value is stored as its JSON
    /// text, so `{"i:1": ["books", "music"]}` seeds an interest list.
    pub fn from_json(seed: &Value) -> StoreResult<Self> {
        let Some(object) = seed.as_object() else {
            return Err(StoreError::malformed("<seed>", "expected a JSON object"));
        };

        let store = Self::new();
        for (key, value) in object {
            match value {
                Value::String(s) => store.insert(key.clone(), s.clone()),
                other => store.insert(key.clone(), other.to_string()),
            }
        }
        Ok(store)
    }

    /// Loads a store from a JSON seed file.
    pub fn from_seed_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let seed: Value = serde_json::from_str(&content)?;
        let store = Self::from_json(&seed)?;
        tracing::info!(path = %path.display(), keys = store.len(), "store seeded");
        Ok(store)
    }

    /// Inserts a persistent value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns `true` if the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_live(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        None
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.read_live(key))
    }

    fn cache_get(&self, key: &str) -> Option<String> {
        self.read_live(key)
    }

    fn cache_set(&self, key: &str, value: &str, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl);
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("missing").unwrap(), None);

        store.insert("i:1", "[]");
        assert_eq!(store.get("i:1").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_cache_expiry() {
        let store = MemoryStore::new();
        store.cache_set("k", "v", Duration::from_millis(10));
        assert_eq!(store.cache_get("k").as_deref(), Some("v"));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.cache_get("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_cache_write_sweeps_expired_entries() {
        let store = MemoryStore::new();
        store.insert("i:1", "[]");
        for n in 0..1_000 {
            store.cache_set(&format!("uid:{n}"), "1.5", Duration::from_millis(1));
        }

        std::thread::sleep(Duration::from_millis(20));
        store.cache_set("uid:last", "3.0", Duration::from_secs(60));

        assert_eq!(store.entries.read().len(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("i:1").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_from_json() {
        let store = MemoryStore::from_json(&json!({
            "i:1": ["books", "music"],
            "i:2": "[\"sport\"]",
        }))
        .unwrap();

        assert_eq!(store.get("i:1").unwrap().as_deref(), Some(r#"["books","music"]"#));
        assert_eq!(store.get("i:2").unwrap().as_deref(), Some(r#"["sport"]"#));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = MemoryStore::from_json(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_from_missing_seed_file() {
        let err = MemoryStore::from_seed_file("/nonexistent/seed.json").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
