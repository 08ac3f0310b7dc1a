//! SQLite-backed store
//!
//! Blobs live in a single `sync_blobs` table keyed by namespace and code.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};

use super::SyncStore;
use crate::error::StoreError;
use crate::sync::{SyncId, SyncRecord};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    namespace: String,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url`
    pub async fn connect(database_url: &str, namespace: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, namespace).await
    }

    /// Wrap an existing pool and make sure the table exists
    pub async fn with_pool(pool: SqlitePool, namespace: &str) -> Result<Self, StoreError> {
        let store = Self {
            pool,
            namespace: namespace.to_string(),
        };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_blobs (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SyncStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, id: &SyncId) -> Result<Option<SyncRecord>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM sync_blobs WHERE namespace = ? AND key = ?")
                .bind(&self.namespace)
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(body,)| serde_json::from_str(&body))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn set(&self, id: &SyncId, record: &SyncRecord) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)?;

        sqlx::query(
            r#"
            INSERT INTO sync_blobs (namespace, key, body, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(namespace, key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.namespace)
        .bind(id.as_str())
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored sync record {} in namespace {}", id, self.namespace);
        Ok(())
    }
}
