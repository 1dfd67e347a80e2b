//! CSV export of computed invoices.
//!
//! Export only formats what the invoices already carry; totals are never re-derived here.

use std::io::Write;

use thiserror::Error;

use invoicer_invoicing::{Invoice, PricedLine};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
}

const HEADER: [&str; 17] = [
    "invoiceNumber",
    "invoiceDate",
    "dueDate",
    "status",
    "currency",
    "customerName",
    "customerEmail",
    "description",
    "quantity",
    "unitPrice",
    "taxRate",
    "itemSubtotal",
    "itemTax",
    "itemTotal",
    "invoiceSubtotal",
    "invoiceTaxTotal",
    "invoiceGrandTotal",
];

/// Write one row per invoice item, carrying the invoice header fields and totals.
pub fn write_invoices_csv<W: Write>(invoices: &[Invoice], writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for invoice in invoices {
        let invoice_date = invoice.invoice_date().to_string();
        let due_date = invoice.due_date().to_string();
        for item in invoice.items() {
            csv.write_record(vec![
                invoice.invoice_number().to_string(),
                invoice_date.clone(),
                due_date.clone(),
                invoice.status().to_string(),
                invoice.currency().to_string(),
                invoice.customer().name.clone(),
                invoice.customer().email.clone(),
                item.description().to_string(),
                item.quantity().to_string(),
                money(item.unit_price()),
                item.tax_rate().to_string(),
                money(item.subtotal()),
                money(item.tax_amount()),
                money(item.total()),
                money(invoice.subtotal()),
                money(invoice.tax_total()),
                money(invoice.grand_total()),
            ])?;
        }
    }

    csv.flush()?;
    Ok(())
}

pub fn invoices_to_csv(invoices: &[Invoice]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_invoices_csv(invoices, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use invoicer_invoicing::{CustomerSnapshot, InvoiceStatus, NewInvoice, NewItem};

    fn invoice() -> Invoice {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        Invoice::create(
            NewInvoice {
                invoice_number: "INV-202403-0001".to_string(),
                customer: CustomerSnapshot::new("Acme, Inc.", "billing@acme.test", ""),
                invoice_date: date,
                due_date: date,
                currency: "USD".to_string(),
                notes: String::new(),
                status: InvoiceStatus::Sent,
                items: vec![
                    NewItem::new("Consulting", 2, 100.0, 10.0),
                    NewItem::new("Hosting", 1, 9.999, 0.0),
                ],
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn one_row_per_item_with_two_decimal_amounts() {
        let csv = invoices_to_csv(&[invoice()]).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("invoiceNumber,invoiceDate"));
        assert_eq!(
            lines[1],
            "INV-202403-0001,2024-03-15,2024-03-15,sent,USD,\"Acme, Inc.\",billing@acme.test,\
             Consulting,2,100.00,10,200.00,20.00,220.00,210.00,20.00,230.00"
        );
        assert!(lines[2].contains(",Hosting,1,10.00,0,10.00,0.00,10.00,"));
    }

    #[test]
    fn empty_input_writes_only_the_header() {
        let csv = invoices_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
