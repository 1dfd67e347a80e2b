//! Total computation engine.
//!
//! Pure functions: no rounding, no clamping, no IO. Rounding to currency precision is a
//! presentation concern and happens only when amounts are formatted.

use serde::{Deserialize, Serialize};

use invoicer_core::ValueObject;

/// Raw pricing inputs of an invoice line.
///
/// Implemented by stored [`Item`](crate::Item)s and by [`NewItem`](crate::NewItem) drafts, so
/// form collaborators can recompute totals on every edit before anything is stored.
pub trait PricedLine {
    fn quantity(&self) -> u32;
    fn unit_price(&self) -> f64;
    /// Tax rate as a percentage (10.0 means 10%).
    fn tax_rate(&self) -> f64;
}

/// Derived amounts of a single item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

impl ValueObject for ItemTotals {}

/// Derived amounts of a whole invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_total: f64,
    pub grand_total: f64,
}

impl ValueObject for InvoiceTotals {}

/// `subtotal = quantity × unit_price`, `tax = subtotal × rate / 100`, `total = subtotal + tax`.
pub fn compute_item_totals(quantity: u32, unit_price: f64, tax_rate: f64) -> ItemTotals {
    let subtotal = f64::from(quantity) * unit_price;
    let tax_amount = subtotal * (tax_rate / 100.0);
    ItemTotals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

/// Sum the item totals of `lines`, recomputing each from its raw fields.
///
/// Derived values already present on the lines are never read, so stale items cannot
/// leak into the invoice totals.
pub fn compute_invoice_totals<L: PricedLine>(lines: &[L]) -> InvoiceTotals {
    let (subtotal, tax_total) = lines.iter().fold((0.0, 0.0), |(sub, tax), line| {
        let t = compute_item_totals(line.quantity(), line.unit_price(), line.tax_rate());
        (sub + t.subtotal, tax + t.tax_amount)
    });
    InvoiceTotals {
        subtotal,
        tax_total,
        grand_total: subtotal + tax_total,
    }
}
