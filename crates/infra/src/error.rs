use thiserror::Error;

use reliefstock_core::DomainError;

use crate::store::StoreError;

/// Unified failure type surfaced by the service layer.
///
/// Everything a handler needs to pick a response status is encoded in the
/// variant; the payload is the human-readable reason.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("stale write: {0}")]
    StaleWrite(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound("not found".to_string()),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("not found".to_string()),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::StaleWrite(msg) => Self::StaleWrite(msg),
            StoreError::Storage(msg) => Self::Storage(msg),
        }
    }
}
