//! Condition cloning
//!
//! A condition payload is a branch set: an evaluation mode, a sequence of
//! branches (each with a `when` expression tree and a list of actions), and
//! an optional fallback branch. Branch, action and expression nodes carry
//! their own `id` fields; those are capacity-internal identifiers, not
//! cross-capacity references, and get the operation suffix appended like
//! every other derived id.

use serde_json::Value;

use crate::application::context::CloneContext;
use crate::application::services::{CloneOutcome, CloneService};
use crate::application::ApplicationResult;
use crate::domain::rewriter::apply_suffix;
use crate::domain::{CapacityKind, DomainError, DomainResult};

impl CloneService {
    /// Clone a condition onto `new_owner_node_id`, recursively cloning the
    /// formulas and tables its branch set references.
    pub fn clone_condition(
        &self,
        source_id: &str,
        new_owner_node_id: &str,
        ctx: &mut CloneContext,
    ) -> ApplicationResult<CloneOutcome> {
        self.clone_kind(CapacityKind::Condition, source_id, new_owner_node_id, ctx)
    }
}

/// Append the suffix to every internal `id` of an already-rewritten branch
/// set. Suffix application strips first, so ids the reference rewrite
/// already touched come out the same, not doubled.
pub(crate) fn resuffix_internals(payload: &Value, suffix: u32) -> DomainResult<Value> {
    let Value::Object(fields) = payload else {
        return Err(DomainError::PayloadShape {
            reason: "condition payload is not a branch set object".into(),
        });
    };
    if let Some(branches) = fields.get("branches") {
        if !branches.is_array() {
            return Err(DomainError::PayloadShape {
                reason: "condition branches is not a sequence".into(),
            });
        }
    }
    Ok(resuffix_ids(payload, suffix))
}

fn resuffix_ids(value: &Value, suffix: u32) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, item)| {
                    if key == "id" {
                        if let Value::String(id) = item {
                            return (key.clone(), Value::String(apply_suffix(id, suffix)));
                        }
                    }
                    (key.clone(), resuffix_ids(item, suffix))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resuffix_ids(item, suffix))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn branch_and_action_ids_get_the_suffix() {
        let payload = json!({
            "id": "set_main",
            "mode": "first-match",
            "branches": [{
                "id": "br_show",
                "when": {
                    "id": "expr_root",
                    "type": "binary",
                    "op": ">",
                    "left": { "kind": "nodeValue", "ref": "@value.node_power-3" },
                    "right": { "kind": "const", "value": 0 }
                },
                "actions": [{ "id": "act_1", "type": "SHOW", "nodeIds": ["node_detail-3"] }]
            }],
            "fallback": { "id": "br_else", "actions": [] }
        });

        let out = resuffix_internals(&payload, 3).unwrap();
        assert_eq!(out["id"], "set_main-3");
        assert_eq!(out["branches"][0]["id"], "br_show-3");
        assert_eq!(out["branches"][0]["when"]["id"], "expr_root-3");
        assert_eq!(out["branches"][0]["actions"][0]["id"], "act_1-3");
        assert_eq!(out["fallback"]["id"], "br_else-3");
        // non-id content is untouched
        assert_eq!(
            out["branches"][0]["when"]["left"]["ref"],
            "@value.node_power-3"
        );
    }

    #[test]
    fn already_suffixed_internal_ids_do_not_double_up() {
        let payload = json!({ "id": "set_main-3", "branches": [] });
        let out = resuffix_internals(&payload, 3).unwrap();
        assert_eq!(out["id"], "set_main-3");
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(resuffix_internals(&json!(["not", "a", "branch set"]), 1).is_err());
        assert!(resuffix_internals(&json!({ "branches": "oops" }), 1).is_err());
    }
}
