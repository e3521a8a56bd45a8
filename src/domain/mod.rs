//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config
//! loading). The scanner and rewriter are pure functions over payload values.

pub mod entities;
pub mod error;
pub mod rewriter;
pub mod scanner;

pub use entities::*;
pub use error::{DomainError, DomainResult};
