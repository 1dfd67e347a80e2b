//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values. In this
/// workspace they are the pieces embedded inside entities: the customer snapshot copied
/// onto an invoice, and the derived totals of items and invoices.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct ItemTotals { subtotal: f64, tax_amount: f64, total: f64 }
///
/// impl ValueObject for ItemTotals {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
