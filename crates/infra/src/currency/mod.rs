//! Currency conversion against an external exchange-rate provider.
//!
//! Conversions are computed for display only; stored invoices are never touched.

pub mod converter;
pub mod provider;

pub use converter::{Conversion, CurrencyConverter};
pub use provider::{CurrencyError, HttpRateProvider, RateProvider, RateTable};
