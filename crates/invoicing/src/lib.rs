//! Invoicing domain module.
//!
//! Invoice and item schemas plus the total computation engine, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod invoice;
pub mod number;
pub mod summary;
pub mod totals;

pub use invoice::{
    CustomerSnapshot, Invoice, InvoiceId, InvoicePatch, InvoiceStatus, Item, ItemId, NewInvoice,
    NewItem,
};
pub use number::{format_invoice_number, generate_invoice_number};
pub use summary::InvoiceSummary;
pub use totals::{InvoiceTotals, ItemTotals, PricedLine, compute_invoice_totals, compute_item_totals};
