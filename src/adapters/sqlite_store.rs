//! SQLite-backed key-value store.
//!
//! Expiry is stored as epoch milliseconds and checked on read; expired rows
//! are only physically removed by `purge_expired`.

use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};
use std::time::Duration;

use crate::domain::error::WatchError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::KeyValueStore;

type Conn = r2d2::PooledConnection<SqliteConnectionManager>;

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> WatchError {
    WatchError::Persistence {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> WatchError {
    WatchError::Persistence {
        reason: format!("query failed: {}", e),
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, WatchError> {
        let db_path = config
            .get_non_empty("store", "path")
            .ok_or_else(|| WatchError::ConfigMissing {
                section: "store".into(),
                key: "path".into(),
            })?;

        let pool_size = config.get_int("store", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, WatchError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<Conn, WatchError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), WatchError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    expires_at INTEGER
                );
                CREATE TABLE IF NOT EXISTS set_members (
                    set_key TEXT NOT NULL,
                    member TEXT NOT NULL,
                    PRIMARY KEY (set_key, member)
                );
                CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at);",
            )
            .map_err(query_err)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, WatchError> {
        self.conn()?
            .query_row(
                "SELECT value FROM kv
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now_millis()],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), WatchError> {
        let expires_at = ttl.map(|d| now_millis() + d.as_millis() as i64);
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, WatchError> {
        let conn = self.conn()?;
        let live = conn
            .query_row(
                "SELECT 1 FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now_millis()],
                |_| Ok(()),
            )
            .optional()
            .map_err(query_err)?
            .is_some();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(query_err)?;
        Ok(live)
    }

    fn set_add(&self, set: &str, member: &str) -> Result<(), WatchError> {
        self.conn()?
            .execute(
                "INSERT OR IGNORE INTO set_members (set_key, member) VALUES (?1, ?2)",
                params![set, member],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn set_remove(&self, set: &str, member: &str) -> Result<(), WatchError> {
        self.conn()?
            .execute(
                "DELETE FROM set_members WHERE set_key = ?1 AND member = ?2",
                params![set, member],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>, WatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT member FROM set_members WHERE set_key = ?1 ORDER BY rowid")
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![set], |row| row.get(0))
            .map_err(query_err)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row.map_err(query_err)?);
        }
        Ok(members)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, WatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT key FROM kv
                 WHERE substr(key, 1, length(?1)) = ?1
                   AND (expires_at IS NULL OR expires_at > ?2)
                 ORDER BY key",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![prefix, now_millis()], |row| row.get(0))
            .map_err(query_err)?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(query_err)?);
        }
        Ok(keys)
    }

    fn purge_expired(&self) -> Result<usize, WatchError> {
        self.conn()?
            .execute(
                "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now_millis()],
            )
            .map_err(query_err)
    }
}
