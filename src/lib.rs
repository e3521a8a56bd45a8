//! treecap: capacity-graph duplication for form-definition trees
//!
//! A node of a form tree can carry three kinds of behavior records
//! ("capacities"): conditions, formulas and tables. Capacities reference
//! nodes and each other through identifiers embedded in their payload text,
//! not through structured pointers. Duplicating a node therefore means
//! recovering that implicit reference graph, cloning every transitively
//! referenced capacity exactly once, rewriting all identifiers consistently
//! under a per-operation numeric suffix, and keeping each node's reverse
//! "linked capacity" index accurate.
//!
//! The layers mirror their responsibilities:
//!
//! - [`domain`] — entities plus the pure reference scanner and identifier
//!   rewriter;
//! - [`application`] — the capacity cloners and the linking index
//!   maintainer, driven by an explicit per-operation [`CloneContext`];
//! - [`infrastructure`] — the `TreeStore` persistence boundary with
//!   in-memory and JSON snapshot implementations;
//! - [`cli`] — a small front end over a snapshot file.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;

pub use application::services::{CloneOutcome, CloneService, LinkService};
pub use application::{ApplicationError, ApplicationResult, CloneCache, CloneContext};
pub use config::Settings;
pub use domain::rewriter::IdentifierMaps;
