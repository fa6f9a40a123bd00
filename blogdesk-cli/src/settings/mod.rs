//! Typed key-value settings.
//!
//! Values are bincode-encoded into a SQLite table. The CLI keeps the last
//! query state of each table here so `--restore` can reopen the same view.

mod backend;
mod sqlite;

pub use backend::SettingsBackend;
pub use sqlite::SqliteBackend;

use std::sync::Arc;

use blogdesk_lib::table::QueryState;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

const QUERY_PREFIX: &str = "query.";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] async_sqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(bincode::Error),
    #[error("deserialization error: {0}")]
    Deserialization(bincode::Error),
}

/// Typed settings over a [`SettingsBackend`].
#[derive(Clone)]
pub struct SettingsProvider {
    backend: Arc<dyn SettingsBackend>,
}

impl SettingsProvider {
    pub fn new(backend: impl SettingsBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        match self.backend.get_bytes(key).await? {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(SettingsError::Deserialization)?,
            )),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), SettingsError> {
        let bytes = bincode::serialize(value).map_err(SettingsError::Serialization)?;
        self.backend.set_bytes(key, bytes).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), SettingsError> {
        self.backend.delete(key).await
    }

    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SettingsError> {
        self.backend.keys_with_prefix(prefix).await
    }

    /// The last stored query state of `table`.
    pub async fn query_state(&self, table: &str) -> Result<Option<QueryState>, SettingsError> {
        self.get(&format!("{}{}", QUERY_PREFIX, table)).await
    }

    /// Stores the query state of `table`; an empty state removes the entry.
    pub async fn set_query_state(&self, table: &str, state: &QueryState) -> Result<(), SettingsError> {
        let key = format!("{}{}", QUERY_PREFIX, table);
        if state.is_empty() {
            return self.delete(&key).await;
        }
        self.set(&key, state).await
    }

    /// Names of the tables with a stored query state.
    pub async fn saved_tables(&self) -> Result<Vec<String>, SettingsError> {
        let keys = self.keys_with_prefix(QUERY_PREFIX).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(QUERY_PREFIX).map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider(dir: &tempfile::TempDir) -> SettingsProvider {
        let backend = SqliteBackend::new(dir.path().join("settings.db")).await.unwrap();
        SettingsProvider::new(backend)
    }

    #[tokio::test]
    async fn test_typed_values_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = provider(&dir).await;

        assert_eq!(settings.get::<u32>("missing").await.unwrap(), None);
        settings.set("count", &42u32).await.unwrap();
        settings.set("name", &"blogdesk".to_string()).await.unwrap();
        assert_eq!(settings.get::<u32>("count").await.unwrap(), Some(42));
        assert_eq!(settings.get::<String>("name").await.unwrap().as_deref(), Some("blogdesk"));

        settings.delete("count").await.unwrap();
        assert_eq!(settings.get::<u32>("count").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let state = QueryState::from_query_string("page=2&sort=title.asc&status=DRAFT&status=PUBLISHED&pinRight=");

        provider(&dir).await.set_query_state("blogs", &state).await.unwrap();

        let reopened = provider(&dir).await;
        assert_eq!(reopened.query_state("blogs").await.unwrap(), Some(state));
        assert_eq!(reopened.query_state("organizations").await.unwrap(), None);
        assert_eq!(reopened.saved_tables().await.unwrap(), vec!["blogs".to_string()]);

        reopened.set_query_state("blogs", &QueryState::default()).await.unwrap();
        assert_eq!(reopened.query_state("blogs").await.unwrap(), None);
    }
}
