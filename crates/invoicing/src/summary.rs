//! Aggregate figures over a set of invoices (dashboard numbers).

use std::collections::HashMap;

use serde::Serialize;

use crate::invoice::{Invoice, InvoiceStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub total_invoices: usize,
    /// Sum of grand totals across all invoices, regardless of currency.
    pub total_amount: f64,
    /// Invoices sent and awaiting payment.
    pub pending_invoices: usize,
    pub overdue_invoices: usize,
    pub by_status: HashMap<InvoiceStatus, usize>,
}

impl InvoiceSummary {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        let mut summary = Self {
            total_invoices: invoices.len(),
            ..Self::default()
        };
        for invoice in invoices {
            summary.total_amount += invoice.grand_total();
            *summary.by_status.entry(invoice.status()).or_default() += 1;
        }
        summary.pending_invoices = summary.count(InvoiceStatus::Sent);
        summary.overdue_invoices = summary.count(InvoiceStatus::Overdue);
        summary
    }

    pub fn count(&self, status: InvoiceStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
