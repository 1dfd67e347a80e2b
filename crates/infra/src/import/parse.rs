use std::io::Read;

use serde::{Deserialize, Serialize};

use super::ImportError;

/// One data row of an import file, exactly as read. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRow {
    pub customer_name: Option<String>,
    pub invoice_number: Option<String>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    /// JSON array of `{description, quantity, unitPrice, taxRate}`.
    pub items: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

impl RawRow {
    /// Field value by its column name, `None` when missing or blank.
    pub fn field(&self, column: &str) -> Option<&str> {
        let value = match column {
            "customerName" => &self.customer_name,
            "invoiceNumber" => &self.invoice_number,
            "issueDate" => &self.issue_date,
            "dueDate" => &self.due_date,
            "items" => &self.items,
            "customerEmail" => &self.customer_email,
            "customerAddress" => &self.customer_address,
            "currency" => &self.currency,
            "notes" => &self.notes,
            _ => return None,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Read CSV with a header row into raw rows.
///
/// Unknown columns are ignored and short rows leave their trailing fields missing.
/// Only unreadable input (I/O failure, invalid UTF-8) or a file without data rows fails
/// the whole batch.
pub fn parse_csv<R: Read>(input: R) -> Result<Vec<RawRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let rows = reader
        .deserialize::<RawRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ImportError::Unreadable(err.to_string()))?;

    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}
