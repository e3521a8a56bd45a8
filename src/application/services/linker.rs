//! Linking index maintenance
//!
//! After a capacity is created or cloned, its final payload decides which
//! nodes point back at it: a node is linked to a capacity when the capacity
//! mentions the node directly or through another capacity it depends on.
//! Capacity-to-capacity references are therefore followed recursively down
//! to node references; a visited set keeps reference cycles finite.
//!
//! Linking is a derived, rebuildable projection: write failures are logged
//! and never roll back the capacity write that triggered them.

use std::collections::BTreeSet;
use std::sync::Arc;

use itertools::Itertools;
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::rewriter::strip_numeric_suffixes;
use crate::domain::scanner::{scan, scan_text};
use crate::domain::{CapacityKind, LinkedField, Reference};
use crate::infrastructure::TreeStore;

/// Maintains the per-node linked-capacity sets.
pub struct LinkService {
    store: Arc<dyn TreeStore>,
}

impl LinkService {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Add `capacity_id` to the linked set of every node the payload
    /// mentions, directly or transitively. Returns how many nodes were
    /// updated; nodes absent from the store are skipped.
    pub fn relink(
        &self,
        kind: CapacityKind,
        capacity_id: &str,
        payload: &Value,
    ) -> ApplicationResult<usize> {
        let node_ids = self.gather_node_ids(payload)?;
        debug!(
            "relink {} {}: {} candidate nodes [{}]",
            kind,
            capacity_id,
            node_ids.len(),
            node_ids.iter().join(", ")
        );
        self.apply(kind.linked_field(), capacity_id, &node_ids, Mode::Add)
    }

    /// Remove `capacity_id` from the linked set of every node the payload
    /// mentions: the exact set-difference counterpart of `relink`, invoked
    /// by the external delete flow.
    pub fn unlink(
        &self,
        kind: CapacityKind,
        capacity_id: &str,
        payload: &Value,
    ) -> ApplicationResult<usize> {
        let node_ids = self.gather_node_ids(payload)?;
        self.apply(kind.linked_field(), capacity_id, &node_ids, Mode::Remove)
    }

    /// Link a variable to every node of the capacity it loads: `source_ref`
    /// is a single reference token (`node-formula:form_1`, a bare node id,
    /// ...) resolved through the same recursive gathering.
    pub fn link_variable(&self, variable_id: &str, source_ref: &str) -> ApplicationResult<usize> {
        let node_ids = self.gather_from_refs(scan_text(source_ref))?;
        self.apply(LinkedField::Variable, variable_id, &node_ids, Mode::Add)
    }

    /// Set-difference counterpart of `link_variable`.
    pub fn unlink_variable(&self, variable_id: &str, source_ref: &str) -> ApplicationResult<usize> {
        let node_ids = self.gather_from_refs(scan_text(source_ref))?;
        self.apply(LinkedField::Variable, variable_id, &node_ids, Mode::Remove)
    }

    /// All node ids a payload reaches, following capacity references
    /// through the store.
    pub fn gather_node_ids(&self, payload: &Value) -> ApplicationResult<BTreeSet<String>> {
        self.gather_from_refs(scan(payload))
    }

    fn gather_from_refs(
        &self,
        refs: BTreeSet<Reference>,
    ) -> ApplicationResult<BTreeSet<String>> {
        let mut node_ids = BTreeSet::new();
        let mut visited = BTreeSet::new();
        self.gather(refs, &mut visited, &mut node_ids)?;
        Ok(node_ids)
    }

    fn gather(
        &self,
        refs: BTreeSet<Reference>,
        visited: &mut BTreeSet<(CapacityKind, String)>,
        node_ids: &mut BTreeSet<String>,
    ) -> ApplicationResult<()> {
        for reference in refs {
            match reference.capacity_kind() {
                None => {
                    node_ids.insert(reference.raw_id().to_string());
                }
                Some(kind) => {
                    let id = reference.raw_id().to_string();
                    if !visited.insert((kind, id.clone())) {
                        continue;
                    }
                    match self.load_capacity_payload(kind, &id)? {
                        Some(payload) => self.gather(scan(&payload), visited, node_ids)?,
                        None => {
                            debug!("gather: {} {} not in store, skipping", kind, id);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Load a referenced capacity's payload by exact id, falling back to the
    /// suffix-stripped base (a pre-clone payload may still name the source).
    fn load_capacity_payload(
        &self,
        kind: CapacityKind,
        id: &str,
    ) -> ApplicationResult<Option<Value>> {
        let found = self
            .store
            .find_capacity(kind, id)
            .map_err(|e| ApplicationError::store(format!("load {} {}", kind, id), e))?;
        if let Some(capacity) = found {
            return Ok(Some(capacity.payload));
        }
        let base = strip_numeric_suffixes(id);
        if base == id {
            return Ok(None);
        }
        let found = self
            .store
            .find_capacity(kind, base)
            .map_err(|e| ApplicationError::store(format!("load {} {}", kind, base), e))?;
        Ok(found.map(|capacity| capacity.payload))
    }

    fn apply(
        &self,
        field: LinkedField,
        capacity_id: &str,
        node_ids: &BTreeSet<String>,
        mode: Mode,
    ) -> ApplicationResult<usize> {
        let ids = [capacity_id.to_string()];
        let mut updated = 0;
        for node_id in node_ids {
            let result = match mode {
                Mode::Add => self.store.add_linked_ids(node_id, field, &ids),
                Mode::Remove => self.store.remove_linked_ids(node_id, field, &ids),
            };
            match result {
                Ok(true) => updated += 1,
                Ok(false) => debug!("{}: node {} not in store, skipped", field.as_str(), node_id),
                // the index is rebuildable; a failed write must not abort
                // the remaining nodes or the capacity write behind us
                Err(e) => warn!(
                    "link failure on {} of node {}: {}",
                    field.as_str(),
                    node_id,
                    e
                ),
            }
        }
        Ok(updated)
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Add,
    Remove,
}
