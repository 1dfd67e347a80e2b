//! SQLite-backed record store.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use super::r#trait::{RecordStore, StoreError, StoreResult};
use super::schema::{PartitionSchema, StoreSchema};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Open(SqlitePool),
    Closed,
}

/// Record store persisted in a SQLite database.
///
/// Records live in one `records` table keyed by `(part, id)`, where `part` is the partition
/// name; secondary index rows live in `record_index`. The connection pool is opened lazily
/// on first use.
///
/// An in-memory database keeps its data only while the pool is open; `close` discards it.
#[derive(Debug)]
pub struct SqliteRecordStore {
    schema: StoreSchema,
    location: Location,
    pool: Mutex<Lifecycle>,
}

impl SqliteRecordStore {
    /// Store backed by the database file at `path`. Parent directories are created on open.
    pub fn open(path: impl Into<PathBuf>, schema: StoreSchema) -> Self {
        Self {
            schema,
            location: Location::File(path.into()),
            pool: Mutex::new(Lifecycle::Uninitialized),
        }
    }

    pub fn open_in_memory(schema: StoreSchema) -> Self {
        Self {
            schema,
            location: Location::Memory,
            pool: Mutex::new(Lifecycle::Uninitialized),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    async fn connect(&self) -> StoreResult<SqlitePool> {
        let pool = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        StoreError::unavailable(format!(
                            "failed to create database directory {}: {err}",
                            parent.display()
                        ))
                    })?;
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true);
                SqlitePool::connect_with(options).await.map_err(unavailable)?
            }
            Location::Memory => {
                let options =
                    SqliteConnectOptions::from_str("sqlite::memory:").map_err(unavailable)?;
                // Every connection to `:memory:` is a separate database, so pin exactly one.
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .map_err(unavailable)?
            }
        };

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                seq       INTEGER PRIMARY KEY AUTOINCREMENT,
                part      TEXT NOT NULL,
                id        TEXT NOT NULL,
                data      TEXT NOT NULL,
                UNIQUE (part, id)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS record_index (
                part       TEXT NOT NULL,
                index_name TEXT NOT NULL,
                value      TEXT NOT NULL,
                id         TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS record_index_lookup \
             ON record_index (part, index_name, value)",
        )
        .execute(&pool)
        .await
        .map_err(unavailable)?;

        match self.path() {
            Some(path) => tracing::info!(path = %path.display(), "opened sqlite record store"),
            None => tracing::debug!("opened in-memory sqlite record store"),
        }
        Ok(pool)
    }

    /// Get the pool, opening it if necessary.
    async fn get_pool(&self) -> StoreResult<SqlitePool> {
        let mut guard = self.pool.lock().await;
        match &*guard {
            Lifecycle::Open(pool) => return Ok(pool.clone()),
            Lifecycle::Closed => return Err(StoreError::unavailable("store is closed")),
            Lifecycle::Uninitialized => {}
        }
        let pool = self.connect().await?;
        *guard = Lifecycle::Open(pool.clone());
        Ok(pool)
    }

    async fn write(
        &self,
        partition: &PartitionSchema,
        record: JsonValue,
        replace: bool,
    ) -> StoreResult<JsonValue> {
        let id = partition.record_key(&record)?;
        let data = serde_json::to_string(&record).map_err(|e| StoreError::Codec(e.to_string()))?;
        let pool = self.get_pool().await?;
        let mut tx = pool.begin().await.map_err(unavailable)?;

        let insert = if replace {
            r#"
            INSERT INTO records (part, id, data) VALUES (?1, ?2, ?3)
            ON CONFLICT (part, id) DO UPDATE SET data = excluded.data
            "#
        } else {
            "INSERT INTO records (part, id, data) VALUES (?1, ?2, ?3)"
        };

        sqlx::query(insert)
            .bind(&partition.name)
            .bind(&id)
            .bind(&data)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if let sqlx::Error::Database(db) = &err {
                    if db.is_unique_violation() {
                        return StoreError::DuplicateKey {
                            partition: partition.name.clone(),
                            id: id.clone(),
                        };
                    }
                }
                unavailable(err)
            })?;

        sqlx::query("DELETE FROM record_index WHERE part = ?1 AND id = ?2")
            .bind(&partition.name)
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        for (index, value) in partition.index_entries(&record) {
            sqlx::query(
                "INSERT INTO record_index (part, index_name, value, id) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&partition.name)
            .bind(&index)
            .bind(&value)
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(record)
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> StoreResult<JsonValue> {
    let data: String = row.try_get("data").map_err(unavailable)?;
    serde_json::from_str(&data).map_err(|e| StoreError::Codec(e.to_string()))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    async fn init(&self) -> StoreResult<()> {
        let mut guard = self.pool.lock().await;
        if !matches!(&*guard, Lifecycle::Open(_)) {
            let pool = self.connect().await?;
            *guard = Lifecycle::Open(pool);
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        let mut guard = self.pool.lock().await;
        if let Lifecycle::Open(pool) = std::mem::replace(&mut *guard, Lifecycle::Closed) {
            pool.close().await;
        }
        Ok(())
    }

    async fn get_all(&self, partition: &str) -> StoreResult<Vec<JsonValue>> {
        self.schema.get(partition)?;
        let pool = self.get_pool().await?;
        let rows = sqlx::query("SELECT data FROM records WHERE part = ?1 ORDER BY seq")
            .bind(partition)
            .fetch_all(&pool)
            .await
            .map_err(unavailable)?;
        rows.iter().map(decode).collect()
    }

    async fn get(&self, partition: &str, id: &str) -> StoreResult<Option<JsonValue>> {
        self.schema.get(partition)?;
        let pool = self.get_pool().await?;
        let row = sqlx::query("SELECT data FROM records WHERE part = ?1 AND id = ?2")
            .bind(partition)
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(unavailable)?;
        row.as_ref().map(decode).transpose()
    }

    async fn add(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue> {
        let schema = self.schema.get(partition)?;
        self.write(schema, record, false).await
    }

    async fn put(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue> {
        let schema = self.schema.get(partition)?;
        self.write(schema, record, true).await
    }

    async fn delete(&self, partition: &str, id: &str) -> StoreResult<()> {
        self.schema.get(partition)?;
        let pool = self.get_pool().await?;
        let mut tx = pool.begin().await.map_err(unavailable)?;
        sqlx::query("DELETE FROM record_index WHERE part = ?1 AND id = ?2")
            .bind(partition)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        sqlx::query("DELETE FROM records WHERE part = ?1 AND id = ?2")
            .bind(partition)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)
    }

    async fn query_by_index(
        &self,
        partition: &str,
        index: &str,
        value: &str,
    ) -> StoreResult<Vec<JsonValue>> {
        self.schema.get(partition)?.index_spec(index)?;
        let pool = self.get_pool().await?;
        let rows = sqlx::query(
            r#"
            SELECT r.data
            FROM record_index i
            JOIN records r ON r.part = i.part AND r.id = i.id
            WHERE i.part = ?1 AND i.index_name = ?2 AND i.value = ?3
            ORDER BY r.seq
            "#,
        )
        .bind(partition)
        .bind(index)
        .bind(value)
        .fetch_all(&pool)
        .await
        .map_err(unavailable)?;
        rows.iter().map(decode).collect()
    }
}
