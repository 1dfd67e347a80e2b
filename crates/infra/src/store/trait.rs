use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::schema::StoreSchema;

/// Record store operation error.
///
/// `Unavailable` is an infrastructure failure (I/O, quota, closed store) and the
/// operation should be abandoned. `DuplicateKey` and `NotFound` are logical outcomes the
/// caller can act on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("record '{id}' already exists in '{partition}'")]
    DuplicateKey { partition: String, id: String },

    #[error("record '{id}' not found in '{partition}'")]
    NotFound { partition: String, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown partition '{0}'")]
    UnknownPartition(String),

    #[error("unknown index '{index}' on partition '{partition}'")]
    UnknownIndex { partition: String, index: String },

    #[error("record codec error: {0}")]
    Codec(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// `true` for outcomes that describe the data rather than the store.
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. } | Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed JSON record storage in named partitions with secondary indexes.
///
/// Every operation lazily ensures [`init`](RecordStore::init) has run. After
/// [`close`](RecordStore::close) every operation fails with [`StoreError::Unavailable`]
/// until `init` is called again.
///
/// Records are returned in insertion order. Replacing a record through `put` keeps its
/// original position.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    fn schema(&self) -> &StoreSchema;

    /// Open partitions and indexes. Idempotent.
    async fn init(&self) -> StoreResult<()>;

    async fn close(&self) -> StoreResult<()>;

    async fn get_all(&self, partition: &str) -> StoreResult<Vec<JsonValue>>;

    /// `None` when no record has this id.
    async fn get(&self, partition: &str, id: &str) -> StoreResult<Option<JsonValue>>;

    /// Insert a new record, failing with `DuplicateKey` if the id is taken.
    async fn add(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue>;

    /// Insert or replace.
    async fn put(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue>;

    /// Remove a record. Removing a missing id is a no-op.
    async fn delete(&self, partition: &str, id: &str) -> StoreResult<()>;

    /// Records whose indexed field equals `value`.
    async fn query_by_index(
        &self,
        partition: &str,
        index: &str,
        value: &str,
    ) -> StoreResult<Vec<JsonValue>>;
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn schema(&self) -> &StoreSchema {
        (**self).schema()
    }

    async fn init(&self) -> StoreResult<()> {
        (**self).init().await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }

    async fn get_all(&self, partition: &str) -> StoreResult<Vec<JsonValue>> {
        (**self).get_all(partition).await
    }

    async fn get(&self, partition: &str, id: &str) -> StoreResult<Option<JsonValue>> {
        (**self).get(partition, id).await
    }

    async fn add(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue> {
        (**self).add(partition, record).await
    }

    async fn put(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue> {
        (**self).put(partition, record).await
    }

    async fn delete(&self, partition: &str, id: &str) -> StoreResult<()> {
        (**self).delete(partition, id).await
    }

    async fn query_by_index(
        &self,
        partition: &str,
        index: &str,
        value: &str,
    ) -> StoreResult<Vec<JsonValue>> {
        (**self).query_by_index(partition, index, value).await
    }
}
