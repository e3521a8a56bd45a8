//! Per-operation clone state
//!
//! Everything a clone operation accumulates lives here and is passed
//! explicitly into every cloner call. Nothing is module-level: two users
//! duplicating different branches at once share only the store.

use std::collections::HashMap;

use crate::domain::rewriter::IdentifierMaps;
use crate::domain::CapacityKind;

/// Source-capacity-id -> already-produced-clone-id, per kind. Guarantees at
/// most one clone per source within an operation and terminates reference
/// cycles: the entry is registered as soon as the new id is derived, before
/// any recursive cloning.
#[derive(Debug, Clone, Default)]
pub struct CloneCache {
    conditions: HashMap<String, String>,
    formulas: HashMap<String, String>,
    tables: HashMap<String, String>,
}

impl CloneCache {
    fn map(&self, kind: CapacityKind) -> &HashMap<String, String> {
        match kind {
            CapacityKind::Condition => &self.conditions,
            CapacityKind::Formula => &self.formulas,
            CapacityKind::Table => &self.tables,
        }
    }

    pub fn get(&self, kind: CapacityKind, source_id: &str) -> Option<&String> {
        self.map(kind).get(source_id)
    }

    pub fn insert(&mut self, kind: CapacityKind, source_id: &str, new_id: &str) {
        let map = match kind {
            CapacityKind::Condition => &mut self.conditions,
            CapacityKind::Formula => &mut self.formulas,
            CapacityKind::Table => &mut self.tables,
        };
        map.insert(source_id.to_string(), new_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.conditions.len() + self.formulas.len() + self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State threaded through one top-level clone operation: the numeric suffix
/// unique to the overall tree copy, the identifier maps supplied by the
/// orchestrator and grown as dependencies are cloned, and the clone cache.
#[derive(Debug, Clone)]
pub struct CloneContext {
    pub suffix: u32,
    pub maps: IdentifierMaps,
    pub cache: CloneCache,
}

impl CloneContext {
    pub fn new(suffix: u32) -> Self {
        Self {
            suffix,
            maps: IdentifierMaps::new(),
            cache: CloneCache::default(),
        }
    }

    pub fn with_maps(suffix: u32, maps: IdentifierMaps) -> Self {
        Self {
            suffix,
            maps,
            cache: CloneCache::default(),
        }
    }
}
