//! Bulk invoice import from CSV.
//!
//! A batch moves `Parsed → Validated → {Rejected | PartiallyPersisted | FullyPersisted}`.
//! Validation is all-or-nothing: a single violation anywhere rejects the whole batch and
//! nothing is written. Persistence is per row: each row is attempted on its own and the
//! failures are reported next to the rows that made it.

pub mod parse;
pub mod pipeline;
pub mod template;
pub mod validate;

use thiserror::Error;

pub use parse::{RawRow, parse_csv};
pub use pipeline::{BatchState, BulkImporter, ImportOutcome, ImportReport, RowFailure};
pub use template::template_csv;
pub use validate::{ImportDefaults, ValidatedRow, Violation, validate_batch, validate_row};

/// Whole-batch import failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("error parsing CSV file: {0}")]
    Unreadable(String),

    #[error("the CSV file is empty")]
    Empty,

    #[error("failed to encode CSV: {0}")]
    Encode(String),
}
