//! Persistence boundary for testability
//!
//! The engine only ever talks to the tree through `TreeStore`, so services
//! can run against an in-memory store in tests and a JSON snapshot in the
//! CLI. Every write is an independent, identifier-addressed operation; the
//! engine never needs multi-record transactions.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ActiveCapacity, Capacity, CapacityKind, LinkedField, Node};

/// Failures of a concrete store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent store client used by the cloners and the linking index.
///
/// Methods touching a node return `Ok(false)` when the node does not exist;
/// during a tree copy, payloads legitimately mention nodes that have not
/// been created yet.
pub trait TreeStore: Send + Sync {
    fn find_node(&self, id: &str) -> StoreResult<Option<Node>>;

    fn upsert_node(&self, node: Node) -> StoreResult<Node>;

    fn find_capacity(&self, kind: CapacityKind, id: &str) -> StoreResult<Option<Capacity>>;

    /// Create-or-update at the record's id. Updating keeps the original
    /// `created_at` and bumps `updated_at`.
    fn upsert_capacity(&self, capacity: Capacity) -> StoreResult<Capacity>;

    /// Set-union ids into a node's linked set.
    fn add_linked_ids(&self, node_id: &str, field: LinkedField, ids: &[String])
        -> StoreResult<bool>;

    /// Set-difference ids out of a node's linked set.
    fn remove_linked_ids(
        &self,
        node_id: &str,
        field: LinkedField,
        ids: &[String],
    ) -> StoreResult<bool>;

    /// Write the node's active-capacity projection for one kind.
    fn set_active_capacity(
        &self,
        node_id: &str,
        kind: CapacityKind,
        active: ActiveCapacity,
    ) -> StoreResult<bool>;
}

/// One whole tree as plain data: the unit both concrete stores operate on,
/// and the on-disk shape of the CLI's JSON snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSnapshot {
    pub nodes: BTreeMap<String, Node>,
    pub conditions: BTreeMap<String, Capacity>,
    pub formulas: BTreeMap<String, Capacity>,
    pub tables: BTreeMap<String, Capacity>,
}

impl TreeSnapshot {
    pub fn capacities(&self, kind: CapacityKind) -> &BTreeMap<String, Capacity> {
        match kind {
            CapacityKind::Condition => &self.conditions,
            CapacityKind::Formula => &self.formulas,
            CapacityKind::Table => &self.tables,
        }
    }

    pub fn capacities_mut(&mut self, kind: CapacityKind) -> &mut BTreeMap<String, Capacity> {
        match kind {
            CapacityKind::Condition => &mut self.conditions,
            CapacityKind::Formula => &mut self.formulas,
            CapacityKind::Table => &mut self.tables,
        }
    }

    fn upsert_capacity(&mut self, mut capacity: Capacity) -> Capacity {
        let slot = self.capacities_mut(capacity.kind);
        if let Some(existing) = slot.get(&capacity.id) {
            capacity.created_at = existing.created_at;
        }
        capacity.updated_at = Utc::now();
        slot.insert(capacity.id.clone(), capacity.clone());
        capacity
    }

    fn with_node<T>(&mut self, node_id: &str, apply: impl FnOnce(&mut Node) -> T) -> Option<T> {
        self.nodes.get_mut(node_id).map(apply)
    }
}

/// Mutex-guarded in-memory store; the default for tests and embedders that
/// manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<TreeSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: TreeSnapshot) -> Self {
        Self {
            data: Mutex::new(snapshot),
        }
    }

    /// Clone out the current snapshot (inspection in tests).
    pub fn snapshot(&self) -> TreeSnapshot {
        self.data.lock().expect("store mutex poisoned").clone()
    }
}

impl TreeStore for MemoryStore {
    fn find_node(&self, id: &str) -> StoreResult<Option<Node>> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.nodes.get(id).cloned())
    }

    fn upsert_node(&self, node: Node) -> StoreResult<Node> {
        let mut data = self.data.lock().expect("store mutex poisoned");
        data.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    fn find_capacity(&self, kind: CapacityKind, id: &str) -> StoreResult<Option<Capacity>> {
        let data = self.data.lock().expect("store mutex poisoned");
        Ok(data.capacities(kind).get(id).cloned())
    }

    fn upsert_capacity(&self, capacity: Capacity) -> StoreResult<Capacity> {
        let mut data = self.data.lock().expect("store mutex poisoned");
        Ok(data.upsert_capacity(capacity))
    }

    fn add_linked_ids(
        &self,
        node_id: &str,
        field: LinkedField,
        ids: &[String],
    ) -> StoreResult<bool> {
        let mut data = self.data.lock().expect("store mutex poisoned");
        Ok(data
            .with_node(node_id, |node| {
                node.linked_ids_mut(field).extend(ids.iter().cloned());
            })
            .is_some())
    }

    fn remove_linked_ids(
        &self,
        node_id: &str,
        field: LinkedField,
        ids: &[String],
    ) -> StoreResult<bool> {
        let mut data = self.data.lock().expect("store mutex poisoned");
        Ok(data
            .with_node(node_id, |node| {
                let set = node.linked_ids_mut(field);
                for id in ids {
                    set.remove(id);
                }
            })
            .is_some())
    }

    fn set_active_capacity(
        &self,
        node_id: &str,
        kind: CapacityKind,
        active: ActiveCapacity,
    ) -> StoreResult<bool> {
        let mut data = self.data.lock().expect("store mutex poisoned");
        Ok(data
            .with_node(node_id, |node| node.set_active(kind, active))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_keeps_created_at_on_update() {
        let store = MemoryStore::new();
        let first = store
            .upsert_capacity(Capacity::new(
                CapacityKind::Formula,
                "form_1",
                "node_a",
                json!(["1", "+", "2"]),
            ))
            .unwrap();
        let second = store
            .upsert_capacity(Capacity::new(
                CapacityKind::Formula,
                "form_1",
                "node_a",
                json!(["3"]),
            ))
            .unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.payload, json!(["3"]));
    }

    #[test]
    fn linked_id_writes_report_missing_nodes() {
        let store = MemoryStore::new();
        let added = store
            .add_linked_ids("node_missing", LinkedField::Formula, &["form_1".into()])
            .unwrap();
        assert!(!added);

        store.upsert_node(Node::new("node_a")).unwrap();
        let added = store
            .add_linked_ids("node_a", LinkedField::Formula, &["form_1".into()])
            .unwrap();
        assert!(added);
    }
}
