use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::error::{Result, StoreError};
use super::key::storage_key;
use super::traits::KeyValueStore;

/// SQLite-backed store over `key_value_storage(id, value)`.
///
/// The pool is the shared handle for all concurrent requests; every
/// operation borrows one connection for a single statement.
pub struct SqlKeyValueStore {
    pool: SqlitePool,
}

impl SqlKeyValueStore {
    /// Open (creating if needed) the database file and ensure the table exists.
    pub async fn open(path: &Path, acquire_timeout: Duration) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect(&db_url)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        info!(path = %path.display(), "Opened key/value store");
        Ok(store)
    }

    /// Wrap an existing pool without touching the schema.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create `key_value_storage` if missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_value_storage (
                id TEXT PRIMARY KEY,
                value TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqlKeyValueStore {
    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let id = storage_key(key)?;
        if value.is_empty() {
            return Err(StoreError::InvalidValue(key.to_string()));
        }

        sqlx::query("REPLACE INTO key_value_storage (id, value) VALUES (?, ?)")
            .bind(&id)
            .bind(value)
            .execute(&self.pool)
            .await?;

        debug!(%id, "Stored value");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let id = storage_key(key)?;

        let rows = sqlx::query("SELECT id, value FROM key_value_storage WHERE id = ?")
            .bind(&id)
            .fetch_all(&self.pool)
            .await?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(Some(row.try_get("value")?)),
            _ => Err(StoreError::DuplicateKey {
                key: id,
                count: rows.len(),
            }),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let id = storage_key(key)?;

        let result = sqlx::query("DELETE FROM key_value_storage WHERE id = ?")
            .bind(&id)
            .execute(&self.pool)
            .await?;

        debug!(%id, rows = result.rows_affected(), "Deleted value");
        Ok(())
    }
}
