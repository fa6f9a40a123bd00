//! SQLite settings store

use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use async_trait::async_trait;
use dashmap::DashMap;

use super::SettingsBackend;
use super::SettingsError;

/// Bumped when the bincode layout of stored values changes; rows written
/// under another version read as missing.
const FORMAT_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cli_setting (
    key TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    value BLOB NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// Settings table in its own database file, read through a `DashMap`.
///
/// The cache only holds values SQLite has accepted.
pub struct SqliteBackend {
    client: Client,
    cache: DashMap<String, Vec<u8>>,
}

impl SqliteBackend {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Self::open(ClientBuilder::new().path(path)).await
    }

    /// A throwaway store, for tests.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, SettingsError> {
        Self::open(ClientBuilder::new().path(":memory:")).await
    }

    async fn open(builder: ClientBuilder) -> Result<Self, SettingsError> {
        let client = builder.open().await?;
        client.conn(|conn| conn.execute_batch(SCHEMA)).await?;
        Ok(Self {
            client,
            cache: DashMap::new(),
        })
    }
}

#[async_trait]
impl SettingsBackend for SqliteBackend {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value.clone()));
        }

        let lookup = key.to_string();
        let stored: Option<Vec<u8>> = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    "SELECT value FROM cli_setting WHERE key = ? AND version = ?",
                    rusqlite::params![lookup, FORMAT_VERSION],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;

        match stored {
            Some(bytes) => {
                self.cache.insert(key.to_string(), bytes.clone());
                Ok(Some(bytes))
            }
            None => {
                log::debug!("Setting '{}' not stored", key);
                Ok(None)
            }
        }
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), SettingsError> {
        let row = (key.to_string(), value.clone());
        let now = chrono::Utc::now().timestamp_millis();
        self.client
            .conn(move |conn| {
                conn.execute(
                    "INSERT INTO cli_setting (key, version, value, updated_at) VALUES (?, ?, ?, ?)
                     ON CONFLICT(key) DO UPDATE SET
                        version = excluded.version,
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    rusqlite::params![row.0, FORMAT_VERSION, row.1, now],
                )
            })
            .await?;

        log::debug!("Stored setting '{}' ({} bytes)", key, value.len());
        self.cache.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SettingsError> {
        let doomed = key.to_string();
        self.client
            .conn(move |conn| conn.execute("DELETE FROM cli_setting WHERE key = ?", [doomed]))
            .await?;
        self.cache.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SettingsError> {
        // substr instead of LIKE: keys contain '_' and '.'
        let prefix = prefix.to_string();
        let keys = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT key FROM cli_setting
                     WHERE substr(key, 1, length(?1)) = ?1 AND version = ?2
                     ORDER BY key",
                )?;
                let rows = stmt.query_map(rusqlite::params![prefix, FORMAT_VERSION], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()
            })
            .await?;
        Ok(keys)
    }
}
