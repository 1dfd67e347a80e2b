//! Local record store boundary.
//!
//! Keyed JSON records in named partitions with secondary indexes, plus typed access for
//! the customer and invoice entities. Backends: in-memory (tests/dev) and SQLite.

pub mod collection;
pub mod in_memory;
pub mod schema;
pub mod sqlite;
pub mod r#trait;

pub use collection::{Collection, Record};
pub use in_memory::InMemoryRecordStore;
pub use r#trait::{RecordStore, StoreError, StoreResult};
pub use schema::{CUSTOMERS, INVOICES, IndexSpec, PartitionSchema, StoreSchema};
pub use sqlite::SqliteRecordStore;
