pub(crate) mod convert;
pub(crate) mod customers;
pub(crate) mod import;
pub(crate) mod invoices;
