use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::services::store::{identify, Collection, RecordStore, StoreError};

/// PostgreSQL-backed system of record
///
/// Each collection is a table of JSONB documents keyed by identity. Table
/// names come from [`Collection::table`], never from caller input.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.ensure_tables().await?;

        Ok(store)
    }

    /// Create a new store from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Create the document tables when they do not exist yet
    async fn ensure_tables(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            let statement = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    data JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                collection.table()
            );
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let query = format!("SELECT data FROM {} WHERE id = $1", collection.table());

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(data): Json<Value> = row.try_get("data")?;
                Ok(Some(data))
            }
            None => {
                tracing::debug!("No {} record with id {}", collection.table(), id);
                Ok(None)
            }
        }
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<String, StoreError> {
        let (id, data) = identify(record)?;
        let query = format!("INSERT INTO {} (id, data) VALUES ($1, $2)", collection.table());

        sqlx::query(&query)
            .bind(&id)
            .bind(Json(&data))
            .execute(&self.pool)
            .await?;

        tracing::debug!("Inserted {} record {}", collection.table(), id);
        Ok(id)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
