//! Formula cloning
//!
//! A formula payload is a token sequence: operand references, operators and
//! literals, e.g. `["@value.node_power", "*", "0.85"]`. Tokens are strings
//! or small objects; some editors persist the whole sequence as one
//! JSON-encoded string. Either way the references live in text, so the
//! generic two-pass rewrite covers the entire payload and formulas need no
//! internal-id regeneration of their own.

use crate::application::context::CloneContext;
use crate::application::services::{CloneOutcome, CloneService};
use crate::application::ApplicationResult;
use crate::domain::CapacityKind;

impl CloneService {
    /// Clone a formula onto `new_owner_node_id`, recursively cloning the
    /// conditions and tables its tokens reference.
    pub fn clone_formula(
        &self,
        source_id: &str,
        new_owner_node_id: &str,
        ctx: &mut CloneContext,
    ) -> ApplicationResult<CloneOutcome> {
        self.clone_kind(CapacityKind::Formula, source_id, new_owner_node_id, ctx)
    }
}
