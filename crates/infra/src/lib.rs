//! Infrastructure layer: record storage, services, bulk import, currency rates, export,
//! configuration.

pub mod config;
pub mod currency;
pub mod export;
pub mod import;
pub mod services;
pub mod store;

pub use config::{ConfigError, InvoicerConfig, RatesConfig};
pub use currency::{
    Conversion, CurrencyConverter, CurrencyError, HttpRateProvider, RateProvider, RateTable,
};
pub use export::{ExportError, invoices_to_csv, write_invoices_csv};
pub use import::{BulkImporter, ImportError, ImportOutcome, ImportReport};
pub use services::{CustomerService, InvoiceNumberPolicy, InvoiceService, ServiceError};
pub use store::{InMemoryRecordStore, RecordStore, SqliteRecordStore, StoreError, StoreSchema};
