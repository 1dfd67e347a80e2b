//! `invoicer-core` — foundation building blocks shared by the invoicing crates.
//!
//! This crate contains **pure domain** primitives (no storage, no network).

pub mod entity;
pub mod error;
pub mod id;
pub mod time;
pub mod validate;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldError, ValidationErrors};
pub use id::RecordId;
pub use time::next_update_timestamp;
pub use value_object::ValueObject;
