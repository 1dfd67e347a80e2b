use std::io::Read;

use chrono::Utc;

use invoicer_invoicing::Invoice;

use super::ImportError;
use super::parse::{RawRow, parse_csv};
use super::validate::{ImportDefaults, ValidatedRow, Violation, validate_batch};
use crate::services::{InvoiceService, ServiceError};

/// Where a batch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Parsed,
    Validated,
    Rejected,
    PartiallyPersisted,
    FullyPersisted,
}

/// A validated row that could not be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub index: usize,
    pub error: ServiceError,
}

impl core::fmt::Display for RowFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Row {}: {}", self.index + 1, self.error)
    }
}

/// Per-row persistence results of an accepted batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub inserted: Vec<Invoice>,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    pub fn state(&self) -> BatchState {
        if self.failures.is_empty() {
            BatchState::FullyPersisted
        } else {
            BatchState::PartiallyPersisted
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Validation failed; nothing was written.
    Rejected { violations: Vec<Violation> },
    Persisted(ImportReport),
}

impl ImportOutcome {
    pub fn state(&self) -> BatchState {
        match self {
            Self::Rejected { .. } => BatchState::Rejected,
            Self::Persisted(report) => report.state(),
        }
    }
}

/// Runs the parse, validate, gate, persist sequence over a batch of invoice rows.
#[derive(Debug, Clone)]
pub struct BulkImporter {
    invoices: InvoiceService,
    defaults: ImportDefaults,
}

impl BulkImporter {
    pub fn new(invoices: InvoiceService, defaults: ImportDefaults) -> Self {
        Self { invoices, defaults }
    }

    /// Import CSV text. Only unreadable or empty input is an `Err`.
    pub async fn import_csv<R: Read>(&self, input: R) -> Result<ImportOutcome, ImportError> {
        let rows = parse_csv(input)?;
        tracing::debug!(rows = rows.len(), state = ?BatchState::Parsed, "import batch parsed");
        Ok(self.import_rows(&rows).await)
    }

    pub async fn import_rows(&self, rows: &[RawRow]) -> ImportOutcome {
        let validated = match validate_batch(rows, &self.defaults, self.invoices.policy()) {
            Ok(validated) => validated,
            Err(violations) => {
                tracing::info!(
                    rows = rows.len(),
                    violations = violations.len(),
                    "import batch rejected"
                );
                return ImportOutcome::Rejected { violations };
            }
        };
        tracing::debug!(rows = validated.len(), state = ?BatchState::Validated, "import batch validated");

        ImportOutcome::Persisted(self.persist(validated).await)
    }

    /// Build and store each row on its own; a failed row never stops the rest.
    pub async fn persist(&self, rows: Vec<ValidatedRow>) -> ImportReport {
        let mut report = ImportReport::default();
        for row in rows {
            let index = row.index;
            let result = match Invoice::create(row.draft, Utc::now()) {
                Ok(invoice) => self.invoices.insert(invoice).await,
                Err(errors) => Err(ServiceError::Validation(errors)),
            };
            match result {
                Ok(invoice) => report.inserted.push(invoice),
                Err(error) => {
                    tracing::warn!(row = index + 1, error = %error, "import row failed");
                    report.failures.push(RowFailure { index, error });
                }
            }
        }
        tracing::info!(
            inserted = report.inserted.len(),
            failed = report.failures.len(),
            state = ?report.state(),
            "import batch persisted"
        );
        report
    }
}
