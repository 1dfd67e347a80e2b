//! Parties domain module: the customers an operator bills.
//!
//! Pure schema and validation rules (no IO, no storage).

pub mod customer;

pub use customer::{Customer, CustomerId, CustomerPatch, NewCustomer};
