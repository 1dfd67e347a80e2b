//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};

/// Entity marker + minimal interface.
///
/// Customers and invoices are entities: two records with the same identifier are the
/// same record, whatever their other fields say.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// When the entity was first stored.
    fn created_at(&self) -> DateTime<Utc>;

    /// When the entity was last written.
    fn updated_at(&self) -> DateTime<Utc>;
}
