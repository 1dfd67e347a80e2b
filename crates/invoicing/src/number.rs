//! Human-readable invoice numbers.

use chrono::{Datelike, NaiveDate};
use rand::Rng;

/// `INV-YYYYMM-NNNN` for the given issue month and four-digit suffix.
pub fn format_invoice_number(date: NaiveDate, suffix: u16) -> String {
    format!(
        "INV-{:04}{:02}-{:04}",
        date.year(),
        date.month(),
        suffix % 10_000
    )
}

/// Suggest an invoice number for `date` with a random suffix.
///
/// Suggestions are not guaranteed unique; the invoice service retries against the store
/// when unique numbers are enforced.
pub fn generate_invoice_number(date: NaiveDate) -> String {
    let suffix = rand::thread_rng().gen_range(0..10_000u16);
    format_invoice_number(date, suffix)
}
