//! Customer and invoice services: lifecycle rules on top of the record store.

pub mod customers;
pub mod error;
pub mod invoices;

pub use customers::CustomerService;
pub use error::{ServiceError, ServiceResult};
pub use invoices::{InvoiceNumberPolicy, InvoiceService};
