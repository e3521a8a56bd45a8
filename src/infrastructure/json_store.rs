//! JSON snapshot store
//!
//! Backs the CLI: the whole tree lives in one JSON file, loaded into memory
//! on open and written back on `flush`. Record-level writes share the
//! snapshot logic with `MemoryStore`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::domain::{ActiveCapacity, Capacity, CapacityKind, LinkedField, Node};
use crate::infrastructure::traits::{MemoryStore, StoreResult, TreeSnapshot, TreeStore};

pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    dirty: Mutex<bool>,
}

impl JsonFileStore {
    /// Open a snapshot file; a missing file starts an empty tree.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str::<TreeSnapshot>(&content)?
        } else {
            debug!("open: no snapshot at {}, starting empty", path.display());
            TreeSnapshot::default()
        };
        Ok(Self {
            path,
            inner: MemoryStore::from_snapshot(snapshot),
            dirty: Mutex::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        *self.dirty.lock().expect("dirty flag mutex poisoned")
    }

    fn mark_dirty(&self) {
        *self.dirty.lock().expect("dirty flag mutex poisoned") = true;
    }

    /// Write the snapshot back to disk if anything changed.
    pub fn flush(&self) -> StoreResult<()> {
        if !self.is_dirty() {
            return Ok(());
        }
        let snapshot = self.inner.snapshot();
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, content)?;
        debug!("flush: wrote snapshot to {}", self.path.display());
        *self.dirty.lock().expect("dirty flag mutex poisoned") = false;
        Ok(())
    }
}

impl TreeStore for JsonFileStore {
    fn find_node(&self, id: &str) -> StoreResult<Option<Node>> {
        self.inner.find_node(id)
    }

    fn upsert_node(&self, node: Node) -> StoreResult<Node> {
        self.mark_dirty();
        self.inner.upsert_node(node)
    }

    fn find_capacity(&self, kind: CapacityKind, id: &str) -> StoreResult<Option<Capacity>> {
        self.inner.find_capacity(kind, id)
    }

    fn upsert_capacity(&self, capacity: Capacity) -> StoreResult<Capacity> {
        self.mark_dirty();
        self.inner.upsert_capacity(capacity)
    }

    fn add_linked_ids(
        &self,
        node_id: &str,
        field: LinkedField,
        ids: &[String],
    ) -> StoreResult<bool> {
        let touched = self.inner.add_linked_ids(node_id, field, ids)?;
        if touched {
            self.mark_dirty();
        }
        Ok(touched)
    }

    fn remove_linked_ids(
        &self,
        node_id: &str,
        field: LinkedField,
        ids: &[String],
    ) -> StoreResult<bool> {
        let touched = self.inner.remove_linked_ids(node_id, field, ids)?;
        if touched {
            self.mark_dirty();
        }
        Ok(touched)
    }

    fn set_active_capacity(
        &self,
        node_id: &str,
        kind: CapacityKind,
        active: ActiveCapacity,
    ) -> StoreResult<bool> {
        let touched = self.inner.set_active_capacity(node_id, kind, active)?;
        if touched {
            self.mark_dirty();
        }
        Ok(touched)
    }
}
