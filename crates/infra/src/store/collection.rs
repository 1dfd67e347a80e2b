use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use invoicer_core::Entity;
use invoicer_invoicing::Invoice;
use invoicer_parties::Customer;

use super::r#trait::{RecordStore, StoreError, StoreResult};
use super::schema::{CUSTOMERS, INVOICES};

/// An entity stored as JSON in a fixed partition.
pub trait Record: Entity + Serialize + DeserializeOwned + Send + Sync {
    const PARTITION: &'static str;

    /// Bring derived state in line with the raw fields before the record is written.
    fn normalize(&mut self) {}
}

impl Record for Customer {
    const PARTITION: &'static str = CUSTOMERS;
}

impl Record for Invoice {
    const PARTITION: &'static str = INVOICES;

    fn normalize(&mut self) {
        self.recompute();
    }
}

/// Typed view over one partition of a shared [`RecordStore`].
#[derive(Debug)]
pub struct Collection<T> {
    store: Arc<dyn RecordStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn all(&self) -> StoreResult<Vec<T>> {
        let rows = self.store.get_all(T::PARTITION).await?;
        rows.into_iter().map(decode).collect()
    }

    pub async fn get(&self, id: &T::Id) -> StoreResult<Option<T>> {
        self.store
            .get(T::PARTITION, &id.to_string())
            .await?
            .map(decode)
            .transpose()
    }

    /// Like [`get`](Self::get), but a missing record is `NotFound`.
    pub async fn require(&self, id: &T::Id) -> StoreResult<T> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            partition: T::PARTITION.to_string(),
            id: id.to_string(),
        })
    }

    pub async fn add(&self, mut record: T) -> StoreResult<T> {
        record.normalize();
        let stored = self.store.add(T::PARTITION, encode(&record)?).await?;
        decode(stored)
    }

    pub async fn put(&self, mut record: T) -> StoreResult<T> {
        record.normalize();
        let stored = self.store.put(T::PARTITION, encode(&record)?).await?;
        decode(stored)
    }

    pub async fn delete(&self, id: &T::Id) -> StoreResult<()> {
        self.store.delete(T::PARTITION, &id.to_string()).await
    }

    pub async fn query(&self, index: &str, value: &str) -> StoreResult<Vec<T>> {
        let rows = self.store.query_by_index(T::PARTITION, index, value).await?;
        rows.into_iter().map(decode).collect()
    }
}

fn encode<T: Serialize>(record: &T) -> StoreResult<JsonValue> {
    serde_json::to_value(record).map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode<T: DeserializeOwned>(row: JsonValue) -> StoreResult<T> {
    serde_json::from_value(row).map_err(|e| StoreError::Codec(e.to_string()))
}
