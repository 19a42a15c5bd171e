//! In-process key-value store with per-entry expiry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::domain::error::WatchError;
use crate::ports::store_port::KeyValueStore;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    sets: HashMap<String, Vec<String>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, WatchError> {
        let now = Instant::now();
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), WatchError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.inner.lock().entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, WatchError> {
        let now = Instant::now();
        let removed = self.inner.lock().entries.remove(key);
        Ok(removed.is_some_and(|e| e.is_live(now)))
    }

    fn set_add(&self, set: &str, member: &str) -> Result<(), WatchError> {
        let mut inner = self.inner.lock();
        let members = inner.sets.entry(set.to_string()).or_default();
        if !members.iter().any(|m| m == member) {
            members.push(member.to_string());
        }
        Ok(())
    }

    fn set_remove(&self, set: &str, member: &str) -> Result<(), WatchError> {
        let mut inner = self.inner.lock();
        if let Some(members) = inner.sets.get_mut(set) {
            members.retain(|m| m != member);
            if members.is_empty() {
                inner.sets.remove(set);
            }
        }
        Ok(())
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>, WatchError> {
        Ok(self.inner.lock().sets.get(set).cloned().unwrap_or_default())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, WatchError> {
        let now = Instant::now();
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn purge_expired(&self) -> Result<usize, WatchError> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.is_live(now));
        Ok(before - inner.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let store = MemoryStore::new();
        store.set("a", "1", None).unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let store = MemoryStore::new();
        store.set("quote", "x", Some(Duration::ZERO)).unwrap();
        assert_eq!(store.get("quote").unwrap(), None);
        assert!(store.keys_with_prefix("quo").unwrap().is_empty());
        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[test]
    fn long_ttl_is_live() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(Duration::from_secs(3600))).unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn set_replaces_value_and_ttl() {
        let store = MemoryStore::new();
        store.set("k", "old", Some(Duration::ZERO)).unwrap();
        store.set("k", "new", None).unwrap();
        assert_eq!(store.get("k").unwrap(), Some("new".to_string()));
    }

    #[test]
    fn delete_reports_live_removal() {
        let store = MemoryStore::new();
        store.set("k", "v", None).unwrap();
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
    }

    #[test]
    fn set_membership() {
        let store = MemoryStore::new();
        store.set_add("s", "a").unwrap();
        store.set_add("s", "b").unwrap();
        store.set_add("s", "a").unwrap();
        assert_eq!(store.set_members("s").unwrap(), vec!["a", "b"]);

        store.set_remove("s", "a").unwrap();
        assert_eq!(store.set_members("s").unwrap(), vec!["b"]);
        store.set_remove("s", "b").unwrap();
        assert!(store.set_members("s").unwrap().is_empty());
        store.set_remove("never", "x").unwrap();
    }

    #[test]
    fn prefix_scan_is_sorted() {
        let store = MemoryStore::new();
        store.set("sub:b", "2", None).unwrap();
        store.set("sub:a", "1", None).unwrap();
        store.set("other", "3", None).unwrap();
        assert_eq!(store.keys_with_prefix("sub:").unwrap(), vec!["sub:a", "sub:b"]);
    }
}
