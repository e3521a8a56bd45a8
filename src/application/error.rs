//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{CapacityKind, DomainError};
use crate::infrastructure::StoreError;

/// Application errors wrap domain errors and add operation-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{kind} not found: {id}")]
    CapacityNotFound { kind: CapacityKind, id: String },

    #[error("store operation failed: {context}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    pub fn not_found(kind: CapacityKind, id: impl Into<String>) -> Self {
        Self::CapacityNotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
