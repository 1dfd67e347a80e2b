use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::r#trait::{RecordStore, StoreError, StoreResult};
use super::schema::{PartitionSchema, StoreSchema};

#[derive(Debug, Default)]
struct PartitionData {
    next_seq: u64,
    rows: BTreeMap<u64, JsonValue>,
    keys: HashMap<String, u64>,
    indexes: HashMap<String, HashMap<String, BTreeSet<u64>>>,
}

impl PartitionData {
    fn index_row(&mut self, schema: &PartitionSchema, seq: u64, record: &JsonValue) {
        for (index, key) in schema.index_entries(record) {
            self.indexes
                .entry(index)
                .or_default()
                .entry(key)
                .or_default()
                .insert(seq);
        }
    }

    fn unindex_row(&mut self, schema: &PartitionSchema, seq: u64, record: &JsonValue) {
        for (index, key) in schema.index_entries(record) {
            if let Some(entries) = self.indexes.get_mut(&index) {
                if let Some(seqs) = entries.get_mut(&key) {
                    seqs.remove(&seq);
                    if seqs.is_empty() {
                        entries.remove(&key);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Open,
    Closed,
}

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    partitions: HashMap<String, PartitionData>,
}

impl State {
    fn total_records(&self) -> usize {
        self.partitions.values().map(|p| p.rows.len()).sum()
    }
}

/// In-memory record store.
///
/// Intended for tests/dev. Data survives `close` followed by `init`.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    schema: StoreSchema,
    quota: Option<usize>,
    state: RwLock<State>,
}

impl InMemoryRecordStore {
    pub fn new(schema: StoreSchema) -> Self {
        Self {
            schema,
            quota: None,
            state: RwLock::new(State {
                lifecycle: Lifecycle::Uninitialized,
                partitions: HashMap::new(),
            }),
        }
    }

    /// Store with the customers/invoices schema.
    pub fn invoicing() -> Self {
        Self::new(StoreSchema::invoicing())
    }

    /// Cap the total number of records. Inserts beyond it fail with `Unavailable`.
    pub fn with_quota(mut self, max_records: usize) -> Self {
        self.quota = Some(max_records);
        self
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::unavailable("lock poisoned"))
    }

    /// Acquire the state for an operation, opening lazily.
    fn open_state(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        let mut state = self.write_state()?;
        match state.lifecycle {
            Lifecycle::Open => {}
            Lifecycle::Closed => return Err(StoreError::unavailable("store is closed")),
            Lifecycle::Uninitialized => self.open_partitions(&mut state),
        }
        Ok(state)
    }

    fn open_partitions(&self, state: &mut State) {
        for partition in self.schema.partitions() {
            state.partitions.entry(partition.name.clone()).or_default();
        }
        state.lifecycle = Lifecycle::Open;
    }

    fn insert(&self, partition: &str, record: JsonValue, replace: bool) -> StoreResult<JsonValue> {
        let schema = self.schema.get(partition)?;
        let key = schema.record_key(&record)?;

        let mut state = self.open_state()?;
        let at_quota = self
            .quota
            .is_some_and(|quota| state.total_records() >= quota);

        let data = state
            .partitions
            .get_mut(partition)
            .ok_or_else(|| StoreError::UnknownPartition(partition.to_string()))?;

        match data.keys.get(&key).copied() {
            Some(_) if !replace => Err(StoreError::DuplicateKey {
                partition: partition.to_string(),
                id: key,
            }),
            Some(seq) => {
                if let Some(previous) = data.rows.remove(&seq) {
                    data.unindex_row(schema, seq, &previous);
                }
                data.index_row(schema, seq, &record);
                data.rows.insert(seq, record.clone());
                Ok(record)
            }
            None if at_quota => Err(StoreError::unavailable("quota exceeded")),
            None => {
                data.next_seq += 1;
                let seq = data.next_seq;
                data.index_row(schema, seq, &record);
                data.rows.insert(seq, record.clone());
                data.keys.insert(key, seq);
                Ok(record)
            }
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::invoicing()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    async fn init(&self) -> StoreResult<()> {
        let mut state = self.write_state()?;
        if state.lifecycle != Lifecycle::Open {
            self.open_partitions(&mut state);
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.lifecycle = Lifecycle::Closed;
        Ok(())
    }

    async fn get_all(&self, partition: &str) -> StoreResult<Vec<JsonValue>> {
        self.schema.get(partition)?;
        let state = self.open_state()?;
        Ok(state
            .partitions
            .get(partition)
            .map(|data| data.rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, partition: &str, id: &str) -> StoreResult<Option<JsonValue>> {
        self.schema.get(partition)?;
        let state = self.open_state()?;
        Ok(state.partitions.get(partition).and_then(|data| {
            data.keys
                .get(id)
                .and_then(|seq| data.rows.get(seq))
                .cloned()
        }))
    }

    async fn add(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue> {
        self.insert(partition, record, false)
    }

    async fn put(&self, partition: &str, record: JsonValue) -> StoreResult<JsonValue> {
        self.insert(partition, record, true)
    }

    async fn delete(&self, partition: &str, id: &str) -> StoreResult<()> {
        let schema = self.schema.get(partition)?;
        let mut state = self.open_state()?;
        if let Some(data) = state.partitions.get_mut(partition) {
            if let Some(seq) = data.keys.remove(id) {
                if let Some(previous) = data.rows.remove(&seq) {
                    data.unindex_row(schema, seq, &previous);
                }
            }
        }
        Ok(())
    }

    async fn query_by_index(
        &self,
        partition: &str,
        index: &str,
        value: &str,
    ) -> StoreResult<Vec<JsonValue>> {
        self.schema.get(partition)?.index_spec(index)?;
        let state = self.open_state()?;
        let Some(data) = state.partitions.get(partition) else {
            return Ok(Vec::new());
        };
        Ok(data
            .indexes
            .get(index)
            .and_then(|entries| entries.get(value))
            .map(|seqs| {
                seqs.iter()
                    .filter_map(|seq| data.rows.get(seq).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}
