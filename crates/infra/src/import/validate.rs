use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;

use invoicer_core::validate::{is_currency_code, is_email};
use invoicer_invoicing::{CustomerSnapshot, InvoiceStatus, NewInvoice, NewItem};

use super::parse::RawRow;
use crate::services::InvoiceNumberPolicy;

const REQUIRED_COLUMNS: [&str; 5] = ["customerName", "invoiceNumber", "issueDate", "dueDate", "items"];

/// A problem with one row of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// 0-based position of the row in the batch.
    pub index: usize,
    /// 0-based position of the offending item within the row, if any.
    pub item: Option<usize>,
    pub message: String,
}

impl Violation {
    pub fn row(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            item: None,
            message: message.into(),
        }
    }

    pub fn item(index: usize, item: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            item: Some(item),
            message: message.into(),
        }
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.item {
            Some(item) => write!(f, "Row {}, Item {}: {}", self.index + 1, item + 1, self.message),
            None => write!(f, "Row {}: {}", self.index + 1, self.message),
        }
    }
}

/// Values applied to optional columns a row leaves blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDefaults {
    pub currency: String,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
        }
    }
}

/// A row that passed validation, ready to become a draft invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub index: usize,
    pub draft: NewInvoice,
}

/// Validate one row, collecting every violation rather than stopping at the first.
pub fn validate_row(
    index: usize,
    row: &RawRow,
    defaults: &ImportDefaults,
) -> Result<ValidatedRow, Vec<Violation>> {
    let mut violations = Vec::new();

    for column in REQUIRED_COLUMNS {
        if row.field(column).is_none() {
            violations.push(Violation::row(
                index,
                format!("Missing required field \"{column}\""),
            ));
        }
    }

    let items = row
        .field("items")
        .and_then(|raw| parse_items(index, raw, &mut violations));

    let issue_date = row.field("issueDate").and_then(|raw| {
        parse_date(raw).or_else(|| {
            violations.push(Violation::row(
                index,
                "Invalid issue date format (use YYYY-MM-DD)",
            ));
            None
        })
    });
    let due_date = row.field("dueDate").and_then(|raw| {
        parse_date(raw).or_else(|| {
            violations.push(Violation::row(index, "Invalid due date format (use YYYY-MM-DD)"));
            None
        })
    });

    let email = row.field("customerEmail").unwrap_or_default();
    if !email.is_empty() && !is_email(email) {
        violations.push(Violation::row(index, format!("Invalid customer email \"{email}\"")));
    }

    let currency = row.field("currency").unwrap_or(defaults.currency.as_str());
    if !is_currency_code(currency) {
        violations.push(Violation::row(
            index,
            format!("Invalid currency \"{currency}\" (use a three-letter code such as USD)"),
        ));
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    let (Some(items), Some(invoice_date), Some(due_date)) = (items, issue_date, due_date) else {
        return Err(violations);
    };

    let draft = NewInvoice {
        invoice_number: row.field("invoiceNumber").unwrap_or_default().to_string(),
        customer: CustomerSnapshot::new(
            row.field("customerName").unwrap_or_default(),
            email,
            row.field("customerAddress").unwrap_or_default(),
        ),
        invoice_date,
        due_date,
        currency: currency.to_string(),
        notes: row.field("notes").unwrap_or_default().to_string(),
        status: InvoiceStatus::Draft,
        items,
    };

    // Schema rules the column checks above do not already cover.
    if let Err(errors) = draft.validate() {
        return Err(errors
            .errors()
            .iter()
            .map(|e| Violation::row(index, e.to_string()))
            .collect());
    }

    Ok(ValidatedRow { index, draft })
}

/// Validate every row of a batch.
///
/// With [`InvoiceNumberPolicy::Unique`], an invoice number already used by an earlier row
/// of the batch is a violation on the later row.
pub fn validate_batch(
    rows: &[RawRow],
    defaults: &ImportDefaults,
    policy: InvoiceNumberPolicy,
) -> Result<Vec<ValidatedRow>, Vec<Violation>> {
    let mut validated = Vec::with_capacity(rows.len());
    let mut violations = Vec::new();
    let mut first_use: HashMap<&str, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        match validate_row(index, row, defaults) {
            Ok(ok) => validated.push(ok),
            Err(found) => violations.extend(found),
        }

        if policy == InvoiceNumberPolicy::Unique {
            if let Some(number) = row.field("invoiceNumber") {
                match first_use.get(number) {
                    Some(first) => violations.push(Violation::row(
                        index,
                        format!(
                            "Duplicate invoice number \"{number}\" (already used in row {})",
                            first + 1
                        ),
                    )),
                    None => {
                        first_use.insert(number, index);
                    }
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(validated)
    } else {
        violations.sort_by_key(|v| v.index);
        Err(violations)
    }
}

fn parse_items(index: usize, raw: &str, violations: &mut Vec<Violation>) -> Option<Vec<NewItem>> {
    let Ok(value) = serde_json::from_str::<JsonValue>(raw) else {
        violations.push(Violation::row(index, "Invalid items JSON format"));
        return None;
    };
    let JsonValue::Array(entries) = value else {
        violations.push(Violation::row(index, "Items must be a valid JSON array"));
        return None;
    };

    let before = violations.len();
    let items: Vec<NewItem> = entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| parse_item(index, position, entry, violations))
        .collect();

    (violations.len() == before).then_some(items)
}

fn parse_item(
    index: usize,
    position: usize,
    entry: &JsonValue,
    violations: &mut Vec<Violation>,
) -> Option<NewItem> {
    let description = entry
        .get("description")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let quantity = entry.get("quantity").filter(|v| !v.is_null());
    let unit_price = entry.get("unitPrice").filter(|v| !v.is_null());

    let (Some(description), Some(quantity), Some(unit_price)) = (description, quantity, unit_price)
    else {
        violations.push(Violation::item(
            index,
            position,
            "Missing required fields (description, quantity, unitPrice)",
        ));
        return None;
    };

    let before = violations.len();

    let quantity = match quantity.as_u64().and_then(|q| u32::try_from(q).ok()) {
        Some(q) if q >= 1 => q,
        _ => {
            violations.push(Violation::item(
                index,
                position,
                "quantity must be a whole number of at least 1",
            ));
            0
        }
    };

    let unit_price = match unit_price.as_f64() {
        Some(p) if p.is_finite() && p >= 0.0 => p,
        _ => {
            violations.push(Violation::item(
                index,
                position,
                "unitPrice must be a number of at least 0",
            ));
            0.0
        }
    };

    let tax_rate = match entry.get("taxRate").filter(|v| !v.is_null()) {
        None => 0.0,
        Some(rate) => match rate.as_f64() {
            Some(r) if r.is_finite() && (0.0..=100.0).contains(&r) => r,
            _ => {
                violations.push(Violation::item(
                    index,
                    position,
                    "taxRate must be a percentage between 0 and 100",
                ));
                0.0
            }
        },
    };

    (violations.len() == before).then(|| NewItem::new(description, quantity, unit_price, tax_rate))
}

/// `YYYY-MM-DD`, exactly, naming a real calendar date.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
