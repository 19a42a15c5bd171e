//! Key-value persistence port trait.
//!
//! Values are opaque strings. Only per-key atomicity is assumed; secondary
//! indexes are plain string sets.

use std::time::Duration;

use crate::domain::error::WatchError;

pub trait KeyValueStore: Send + Sync {
    /// `None` when the key is missing or its TTL has elapsed.
    fn get(&self, key: &str) -> Result<Option<String>, WatchError>;

    /// Insert or replace. `ttl = None` keeps the entry until deleted.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), WatchError>;

    /// Returns whether a live entry was removed.
    fn delete(&self, key: &str) -> Result<bool, WatchError>;

    fn set_add(&self, set: &str, member: &str) -> Result<(), WatchError>;

    fn set_remove(&self, set: &str, member: &str) -> Result<(), WatchError>;

    /// Members in insertion order.
    fn set_members(&self, set: &str) -> Result<Vec<String>, WatchError>;

    /// Live keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, WatchError>;

    /// Drop expired entries from storage. Reads already ignore them.
    fn purge_expired(&self) -> Result<usize, WatchError>;
}
