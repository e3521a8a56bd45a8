//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent business logic violations.
/// These are independent of storage and CLI concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("unknown capacity kind: {0}")]
    UnknownKind(String),

    #[error("capacity payload has unexpected shape: {reason}")]
    PayloadShape { reason: String },
}

pub type DomainResult<T> = Result<T, DomainError>;
