//! Application services
//!
//! Concrete service implementations that orchestrate domain logic. Services
//! depend on the persistence boundary trait (`TreeStore`) but are themselves
//! concrete structs, not traits. The per-kind cloner entry points live in
//! `condition` / `formula` / `table`; the shared step sequence in `cloner`.

mod cloner;
mod condition;
mod formula;
mod linker;
mod table;

pub use cloner::{CloneOutcome, CloneService};
pub use linker::LinkService;
