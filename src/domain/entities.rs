//! Domain entities: core data structures

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// The three kinds of behavior records a node can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityKind {
    Condition,
    Formula,
    Table,
}

impl CapacityKind {
    pub const ALL: [CapacityKind; 3] = [
        CapacityKind::Condition,
        CapacityKind::Formula,
        CapacityKind::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityKind::Condition => "condition",
            CapacityKind::Formula => "formula",
            CapacityKind::Table => "table",
        }
    }

    /// The node-side linked set this kind is indexed under.
    pub fn linked_field(&self) -> LinkedField {
        match self {
            CapacityKind::Condition => LinkedField::Condition,
            CapacityKind::Formula => LinkedField::Formula,
            CapacityKind::Table => LinkedField::Table,
        }
    }
}

impl fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapacityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "condition" => Ok(CapacityKind::Condition),
            "formula" => Ok(CapacityKind::Formula),
            "table" => Ok(CapacityKind::Table),
            other => Err(DomainError::UnknownKind(other.to_string())),
        }
    }
}

/// The four per-node reverse-index sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkedField {
    Formula,
    Condition,
    Table,
    Variable,
}

impl LinkedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkedField::Formula => "linked_formula_ids",
            LinkedField::Condition => "linked_condition_ids",
            LinkedField::Table => "linked_table_ids",
            LinkedField::Variable => "linked_variable_ids",
        }
    }
}

/// Denormalized projection of a node's currently active capacity of one kind.
/// Consumed by the form renderer; written by the cloners (step 8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCapacity {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A form-definition tree element.
///
/// The linked sets are maintained exclusively by the linking index: at rest,
/// a node's set for a kind equals the set of capacities of that kind whose
/// payload mentions the node, directly or through another capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: String,
    pub parent_id: Option<String>,
    pub label: Option<String>,
    pub linked_formula_ids: BTreeSet<String>,
    pub linked_condition_ids: BTreeSet<String>,
    pub linked_table_ids: BTreeSet<String>,
    pub linked_variable_ids: BTreeSet<String>,
    pub active_condition: Option<ActiveCapacity>,
    pub active_formula: Option<ActiveCapacity>,
    pub active_table: Option<ActiveCapacity>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_label(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn linked_ids(&self, field: LinkedField) -> &BTreeSet<String> {
        match field {
            LinkedField::Formula => &self.linked_formula_ids,
            LinkedField::Condition => &self.linked_condition_ids,
            LinkedField::Table => &self.linked_table_ids,
            LinkedField::Variable => &self.linked_variable_ids,
        }
    }

    pub fn linked_ids_mut(&mut self, field: LinkedField) -> &mut BTreeSet<String> {
        match field {
            LinkedField::Formula => &mut self.linked_formula_ids,
            LinkedField::Condition => &mut self.linked_condition_ids,
            LinkedField::Table => &mut self.linked_table_ids,
            LinkedField::Variable => &mut self.linked_variable_ids,
        }
    }

    pub fn active(&self, kind: CapacityKind) -> Option<&ActiveCapacity> {
        match kind {
            CapacityKind::Condition => self.active_condition.as_ref(),
            CapacityKind::Formula => self.active_formula.as_ref(),
            CapacityKind::Table => self.active_table.as_ref(),
        }
    }

    pub fn set_active(&mut self, kind: CapacityKind, active: ActiveCapacity) {
        match kind {
            CapacityKind::Condition => self.active_condition = Some(active),
            CapacityKind::Formula => self.active_formula = Some(active),
            CapacityKind::Table => self.active_table = Some(active),
        }
    }

    /// Whether the node currently carries a capacity of the given kind.
    pub fn has_capacity(&self, kind: CapacityKind) -> bool {
        self.active(kind).is_some()
    }
}

/// An attached behavior record owned by exactly one node.
///
/// The payload is semi-structured: a branch set for a condition, a token
/// sequence for a formula, a column/row/cell set for a table. References to
/// other nodes and capacities are encoded as substrings inside its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub id: String,
    pub node_id: String,
    pub kind: CapacityKind,
    pub name: Option<String>,
    pub description: Option<String>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Capacity {
    pub fn new(
        kind: CapacityKind,
        id: impl Into<String>,
        node_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            node_id: node_id.into(),
            kind,
            name: None,
            description: None,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A reference recovered from a capacity payload. Not stored anywhere;
/// the scanner produces these transiently and nothing owns them.
///
/// The raw id keeps any numeric suffix already present on the identifier
/// (a reference into an already-cloned payload).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reference {
    Node(String),
    Formula(String),
    Condition(String),
    Table(String),
    /// A value intentionally shared across independent clone lineages;
    /// exempt from automatic suffixing unless an explicit mapping exists.
    Shared(String),
}

impl Reference {
    pub fn raw_id(&self) -> &str {
        match self {
            Reference::Node(id)
            | Reference::Formula(id)
            | Reference::Condition(id)
            | Reference::Table(id)
            | Reference::Shared(id) => id,
        }
    }

    /// The capacity kind this reference points at, if it points at one.
    pub fn capacity_kind(&self) -> Option<CapacityKind> {
        match self {
            Reference::Formula(_) => Some(CapacityKind::Formula),
            Reference::Condition(_) => Some(CapacityKind::Condition),
            Reference::Table(_) => Some(CapacityKind::Table),
            Reference::Node(_) | Reference::Shared(_) => None,
        }
    }
}

/// Mint a fresh node identifier in the editor's `node_<hex>` shape.
pub fn generate_node_id() -> String {
    format!("node_{}", uuid::Uuid::new_v4().simple())
}

/// Mint a fresh capacity identifier, e.g. `cond_<hex>`.
pub fn generate_capacity_id(kind: CapacityKind) -> String {
    let prefix = match kind {
        CapacityKind::Condition => "cond",
        CapacityKind::Formula => "form",
        CapacityKind::Table => "tbl",
    };
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in CapacityKind::ALL {
            assert_eq!(kind.as_str().parse::<CapacityKind>().unwrap(), kind);
        }
        assert!("variable".parse::<CapacityKind>().is_err());
    }

    #[test]
    fn linked_sets_are_addressable_by_field() {
        let mut node = Node::new("node_a");
        node.linked_ids_mut(LinkedField::Formula)
            .insert("form_1".into());
        assert!(node.linked_ids(LinkedField::Formula).contains("form_1"));
        assert!(node.linked_ids(LinkedField::Condition).is_empty());
    }

    #[test]
    fn generated_ids_carry_their_prefix() {
        assert!(generate_node_id().starts_with("node_"));
        assert!(generate_capacity_id(CapacityKind::Table).starts_with("tbl_"));
    }
}
