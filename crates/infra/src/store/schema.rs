//! Partition and secondary-index definitions.

use serde_json::Value as JsonValue;

use super::r#trait::StoreError;

/// Partition holding [`Customer`](invoicer_parties::Customer) records.
pub const CUSTOMERS: &str = "customers";
/// Partition holding [`Invoice`](invoicer_invoicing::Invoice) records.
pub const INVOICES: &str = "invoices";

/// A named secondary index over one field of the records in a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    /// JSON pointer to the indexed field, e.g. `/status` or `/customer/name`.
    pub key_path: String,
}

/// A named collection of records keyed by a primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSchema {
    pub name: String,
    /// JSON pointer to the primary key. The key must be a string.
    pub key_path: String,
    pub indexes: Vec<IndexSpec>,
}

impl PartitionSchema {
    /// Partition keyed by the record's `id` field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: "/id".to_string(),
            indexes: Vec::new(),
        }
    }

    pub fn index(mut self, name: impl Into<String>, key_path: impl Into<String>) -> Self {
        self.indexes.push(IndexSpec {
            name: name.into(),
            key_path: key_path.into(),
        });
        self
    }

    pub fn index_spec(&self, index: &str) -> Result<&IndexSpec, StoreError> {
        self.indexes
            .iter()
            .find(|spec| spec.name == index)
            .ok_or_else(|| StoreError::UnknownIndex {
                partition: self.name.clone(),
                index: index.to_string(),
            })
    }

    /// Extract the primary key of `record`.
    pub fn record_key(&self, record: &JsonValue) -> Result<String, StoreError> {
        match record.pointer(&self.key_path) {
            Some(JsonValue::String(key)) if !key.is_empty() => Ok(key.clone()),
            _ => Err(StoreError::Codec(format!(
                "record in partition '{}' has no string key at '{}'",
                self.name, self.key_path
            ))),
        }
    }

    /// `(index name, index key)` pairs under which `record` must be indexed.
    pub fn index_entries(&self, record: &JsonValue) -> Vec<(String, String)> {
        self.indexes
            .iter()
            .filter_map(|spec| {
                record
                    .pointer(&spec.key_path)
                    .and_then(index_key)
                    .map(|key| (spec.name.clone(), key))
            })
            .collect()
    }
}

/// Index key of a JSON value: strings as-is, scalars as their JSON text.
///
/// `null` is not indexed.
pub fn index_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The full set of partitions a store serves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSchema {
    partitions: Vec<PartitionSchema>,
}

impl StoreSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(mut self, partition: PartitionSchema) -> Self {
        self.partitions.push(partition);
        self
    }

    /// Customers and invoices with their lookup indexes.
    pub fn invoicing() -> Self {
        Self::new()
            .partition(
                PartitionSchema::new(CUSTOMERS)
                    .index("by-name", "/name")
                    .index("by-email", "/email"),
            )
            .partition(
                PartitionSchema::new(INVOICES)
                    .index("by-invoiceNumber", "/invoiceNumber")
                    .index("by-date", "/invoiceDate")
                    .index("by-status", "/status")
                    .index("by-customerName", "/customer/name"),
            )
    }

    pub fn get(&self, partition: &str) -> Result<&PartitionSchema, StoreError> {
        self.partitions
            .iter()
            .find(|p| p.name == partition)
            .ok_or_else(|| StoreError::UnknownPartition(partition.to_string()))
    }

    pub fn partitions(&self) -> &[PartitionSchema] {
        &self.partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_index_entries_and_skips_missing_fields() {
        let schema = StoreSchema::invoicing();
        let invoices = schema.get(INVOICES).unwrap();
        let record = json!({
            "id": "a",
            "invoiceNumber": "INV-1",
            "status": "draft",
            "customer": { "name": "Acme" },
        });

        let entries = invoices.index_entries(&record);
        assert_eq!(
            entries,
            vec![
                ("by-invoiceNumber".to_string(), "INV-1".to_string()),
                ("by-status".to_string(), "draft".to_string()),
                ("by-customerName".to_string(), "Acme".to_string()),
            ]
        );
    }

    #[test]
    fn record_key_must_be_a_string() {
        let customers = StoreSchema::invoicing().get(CUSTOMERS).unwrap().clone();
        assert_eq!(customers.record_key(&json!({"id": "c-1"})).unwrap(), "c-1");
        assert!(matches!(
            customers.record_key(&json!({"id": 7})),
            Err(StoreError::Codec(_))
        ));
        assert!(matches!(
            customers.record_key(&json!({"name": "x"})),
            Err(StoreError::Codec(_))
        ));
    }

    #[test]
    fn unknown_partition_and_index_are_reported() {
        let schema = StoreSchema::invoicing();
        assert!(matches!(
            schema.get("payments"),
            Err(StoreError::UnknownPartition(_))
        ));
        assert!(matches!(
            schema.get(CUSTOMERS).unwrap().index_spec("by-status"),
            Err(StoreError::UnknownIndex { .. })
        ));
    }

    #[test]
    fn scalar_index_keys() {
        assert_eq!(index_key(&json!(3)), Some("3".to_string()));
        assert_eq!(index_key(&json!(true)), Some("true".to_string()));
        assert_eq!(index_key(&JsonValue::Null), None);
    }
}
