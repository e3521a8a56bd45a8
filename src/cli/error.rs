//! CLI-level errors (wraps application and store errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::StoreError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::Store(StoreError::Io(_)) => crate::exitcode::IOERR,
            CliError::Store(StoreError::Serde(_)) => crate::exitcode::DATAERR,
            CliError::Application(e) => match e {
                ApplicationError::Domain(DomainError::UnknownKind(_)) => crate::exitcode::USAGE,
                ApplicationError::Domain(_) => crate::exitcode::DATAERR,
                ApplicationError::CapacityNotFound { .. } => crate::exitcode::NOINPUT,
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::Store { .. } => crate::exitcode::SOFTWARE,
            },
        }
    }
}
