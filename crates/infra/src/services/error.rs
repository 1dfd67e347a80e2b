use thiserror::Error;

use invoicer_core::ValidationErrors;

use crate::store::StoreError;

/// Service operation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("invoice number '{0}' is already in use")]
    DuplicateInvoiceNumber(String),

    #[error("no unused invoice number left for '{0}'")]
    InvoiceNumbersExhausted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound { .. }))
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
