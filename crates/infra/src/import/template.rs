use serde_json::json;

use super::ImportError;
use super::parse::RawRow;

/// A header plus one example row, accepted as-is by the import pipeline.
pub fn template_csv() -> Result<String, ImportError> {
    let items = json!([{
        "description": "Web Development",
        "quantity": 1,
        "unitPrice": 1500.00,
        "taxRate": 10
    }]);

    let example = RawRow {
        customer_name: Some("John Doe".to_string()),
        invoice_number: Some("INV-001".to_string()),
        issue_date: Some("2024-03-15".to_string()),
        due_date: Some("2024-04-15".to_string()),
        items: Some(items.to_string()),
        customer_email: Some("john@example.com".to_string()),
        customer_address: Some("1 Main Street".to_string()),
        currency: Some("USD".to_string()),
        notes: Some(String::new()),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .serialize(&example)
        .map_err(|err| ImportError::Encode(err.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|err| ImportError::Encode(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| ImportError::Encode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportDefaults, parse_csv, validate_row};

    #[test]
    fn template_starts_with_the_required_columns() {
        let csv = template_csv().unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("customerName,invoiceNumber,issueDate,dueDate,items"));
    }

    #[test]
    fn template_row_passes_validation() {
        let csv = template_csv().unwrap();
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);

        let validated = validate_row(0, &rows[0], &ImportDefaults::default()).unwrap();
        assert_eq!(validated.draft.items.len(), 1);
        assert_eq!(validated.draft.items[0].unit_price, 1500.0);
        assert_eq!(validated.draft.items[0].tax_rate, 10.0);
    }
}
