//! Typed access to the key-value store.
//!
//! Key layout:
//!
//! | key                              | value             | ttl               |
//! |----------------------------------|-------------------|-------------------|
//! | `indicator:{SYMBOL}`             | `IndicatorResult` | result ttl        |
//! | `prices:{SYMBOL}`                | `PriceQuote`      | quote ttl         |
//! | `indicator_notify:{id}`          | RFC 3339 time     | cooldown record   |
//! | `config:indicator`               | `IndicatorConfig` | none              |
//! | `subscription:{id}`              | `Subscription`    | none              |
//! | `subscriptions:symbol:{SYMBOL}`  | set of ids        | none              |
//! | `subscriptions:user:{user_id}`   | set of ids        | none              |

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::config::IndicatorConfig;
use crate::domain::error::WatchError;
use crate::domain::indicator::IndicatorResult;
use crate::domain::quote::PriceQuote;
use crate::domain::subscription::Subscription;
use crate::ports::store_port::KeyValueStore;

pub const CONFIG_KEY: &str = "config:indicator";
pub const SUBSCRIPTION_PREFIX: &str = "subscription:";

pub fn indicator_key(symbol: &str) -> String {
    format!("indicator:{}", symbol.to_uppercase())
}

pub fn quote_key(symbol: &str) -> String {
    format!("prices:{}", symbol.to_uppercase())
}

pub fn notify_key(subscription_id: &str) -> String {
    format!("indicator_notify:{}", subscription_id)
}

fn subscription_key(id: &str) -> String {
    format!("{}{}", SUBSCRIPTION_PREFIX, id)
}

fn symbol_index(symbol: &str) -> String {
    format!("subscriptions:symbol:{}", symbol.to_uppercase())
}

fn user_index(user_id: &str) -> String {
    format!("subscriptions:user:{}", user_id)
}

#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, WatchError> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| WatchError::persistence(format!("corrupt value at {}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), WatchError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| WatchError::persistence(format!("failed to encode {}: {}", key, e)))?;
        self.store.set(key, &raw, ttl)
    }

    pub fn get_indicator_result(&self, symbol: &str) -> Result<Option<IndicatorResult>, WatchError> {
        self.get_json(&indicator_key(symbol))
    }

    pub fn set_indicator_result(
        &self,
        result: &IndicatorResult,
        ttl: Duration,
    ) -> Result<(), WatchError> {
        self.set_json(&indicator_key(&result.symbol), result, Some(ttl))
    }

    pub fn get_quote(&self, symbol: &str) -> Result<Option<PriceQuote>, WatchError> {
        self.get_json(&quote_key(symbol))
    }

    pub fn set_quote(&self, quote: &PriceQuote, ttl: Duration) -> Result<(), WatchError> {
        self.set_json(&quote_key(&quote.symbol), quote, Some(ttl))
    }

    pub fn get_last_notify_time(
        &self,
        subscription_id: &str,
    ) -> Result<Option<DateTime<Utc>>, WatchError> {
        self.get_json(&notify_key(subscription_id))
    }

    pub fn set_last_notify_time(
        &self,
        subscription_id: &str,
        at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), WatchError> {
        self.set_json(&notify_key(subscription_id), &at, Some(ttl))
    }

    /// Stored engine config, or the built-in default when none has been saved.
    pub fn get_indicator_config(&self) -> Result<IndicatorConfig, WatchError> {
        Ok(self.get_json(CONFIG_KEY)?.unwrap_or_default())
    }

    pub fn set_indicator_config(&self, config: &IndicatorConfig) -> Result<(), WatchError> {
        self.set_json(CONFIG_KEY, config, None)
    }

    /// Write the record and add it to the symbol and user indexes.
    pub fn save_subscription(&self, sub: &Subscription) -> Result<(), WatchError> {
        self.set_json(&subscription_key(&sub.id), sub, None)?;
        self.store.set_add(&symbol_index(&sub.symbol), &sub.id)?;
        self.store.set_add(&user_index(&sub.user_id), &sub.id)
    }

    pub fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, WatchError> {
        self.get_json(&subscription_key(id))
    }

    /// Remove the record and both index entries. Cooldown records are left to expire.
    pub fn delete_subscription(&self, sub: &Subscription) -> Result<(), WatchError> {
        self.store.delete(&subscription_key(&sub.id))?;
        self.store.set_remove(&symbol_index(&sub.symbol), &sub.id)?;
        self.store.set_remove(&user_index(&sub.user_id), &sub.id)
    }

    pub fn subscriptions_by_symbol(&self, symbol: &str) -> Result<Vec<Subscription>, WatchError> {
        self.load_index(&symbol_index(symbol))
    }

    pub fn subscriptions_by_user(&self, user_id: &str) -> Result<Vec<Subscription>, WatchError> {
        self.load_index(&user_index(user_id))
    }

    pub fn subscription_count(&self) -> Result<usize, WatchError> {
        Ok(self.store.keys_with_prefix(SUBSCRIPTION_PREFIX)?.len())
    }

    /// Records that are missing or unreadable are skipped so one bad entry
    /// never hides the rest of the index.
    fn load_index(&self, index: &str) -> Result<Vec<Subscription>, WatchError> {
        let mut subs = Vec::new();
        for id in self.store.set_members(index)? {
            match self.get_subscription(&id) {
                Ok(Some(sub)) => subs.push(sub),
                Ok(None) => tracing::debug!(index, subscription_id = %id, "dangling index entry"),
                Err(e) => {
                    tracing::warn!(index, subscription_id = %id, error = %e, "skipping unreadable subscription")
                }
            }
        }
        Ok(subs)
    }

    /// Physically drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, WatchError> {
        self.store.purge_expired()
    }
}
