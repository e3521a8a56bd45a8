//! Capacity cloning engine
//!
//! One clone operation walks the implicit reference graph of a capacity,
//! clones every transitively referenced capacity exactly once, rewrites each
//! payload against the accumulated identifier maps, and persists the result
//! under suffix-derived ids. The per-kind entry points live in the sibling
//! modules; the step sequence shared by all three kinds lives here:
//!
//! 1. clone-cache lookup (idempotent short-circuit)
//! 2. load the source, trailing numeric suffix stripped
//! 3. derive the new id and register the cache entry (cycle guard)
//! 4. clone dependencies of other kinds, recording their maps
//! 5. rewrite the payload, regenerate internal ids, force shared suffixes
//! 6. upsert the record under the new id and owner
//! 7. update the linking index
//! 8. update the owner's active-capacity projection
//! 9. confirm the cache entry
//!
//! A missing dependency is fatal only to its own branch: it is logged and
//! the siblings (and the owning clone) proceed.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::application::context::CloneContext;
use crate::application::services::{condition, table, LinkService};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::rewriter::{
    apply_suffix, force_shared_suffixes, rewrite_value, strip_numeric_suffixes,
};
use crate::domain::scanner::scan;
use crate::domain::{ActiveCapacity, Capacity, CapacityKind, DomainError};
use crate::infrastructure::TreeStore;

/// What one cloner call produced: the derived id and the final payload as
/// persisted.
#[derive(Debug, Clone)]
pub struct CloneOutcome {
    pub new_id: String,
    pub payload: Value,
}

/// The capacity cloners for all three kinds, sharing one store and one
/// linking index. Per-operation state stays out of the service: every call
/// takes the operation's `CloneContext` explicitly.
pub struct CloneService {
    store: Arc<dyn TreeStore>,
    linker: LinkService,
    strict_rewrite: bool,
}

impl CloneService {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self::with_strict_rewrite(store, false)
    }

    /// With `strict_rewrite` a payload whose internal structure cannot be
    /// regenerated fails the clone instead of being persisted with the plain
    /// text rewrite only.
    pub fn with_strict_rewrite(store: Arc<dyn TreeStore>, strict_rewrite: bool) -> Self {
        let linker = LinkService::new(store.clone());
        Self {
            store,
            linker,
            strict_rewrite,
        }
    }

    /// Dispatch by kind; used by callers that carry the kind as data.
    pub fn clone_capacity(
        &self,
        kind: CapacityKind,
        source_id: &str,
        new_owner_node_id: &str,
        ctx: &mut CloneContext,
    ) -> ApplicationResult<CloneOutcome> {
        self.clone_kind(kind, source_id, new_owner_node_id, ctx)
    }

    pub(crate) fn clone_kind(
        &self,
        kind: CapacityKind,
        source_id: &str,
        new_owner_node_id: &str,
        ctx: &mut CloneContext,
    ) -> ApplicationResult<CloneOutcome> {
        // step 1: at most one clone per source per operation
        if let Some(cached_id) = ctx.cache.get(kind, source_id).cloned() {
            debug!("clone {} {}: cache hit -> {}", kind, source_id, cached_id);
            if let Some(existing) = self.find_capacity(kind, &cached_id)? {
                return Ok(CloneOutcome {
                    new_id: existing.id,
                    payload: existing.payload,
                });
            }
            // mid-recursion hit on a reference cycle: the record is written
            // once the outer frame completes, the id is already final
            return Ok(CloneOutcome {
                new_id: cached_id,
                payload: Value::Null,
            });
        }

        // step 2: re-cloning a clone resolves to its original
        let source = self.load_source(kind, source_id)?;

        // step 3: deterministic derived id, registered before any recursion
        let new_id = apply_suffix(source_id, ctx.suffix);
        ctx.cache.insert(kind, source_id, &new_id);
        debug!(
            "clone {} {} -> {} (owner {})",
            kind, source_id, new_id, new_owner_node_id
        );

        // step 4: dependents only after their dependencies are mapped
        self.clone_dependencies(kind, &source.payload, new_owner_node_id, ctx)?;

        // step 5
        let payload = self.finalize_payload(kind, &source, ctx)?;

        // step 6
        let mut record = Capacity::new(kind, new_id.clone(), new_owner_node_id, payload.clone());
        record.name = source
            .name
            .as_ref()
            .map(|name| format!("{}-{}", name, ctx.suffix));
        record.description = source.description.clone();
        let record = self
            .store
            .upsert_capacity(record)
            .map_err(|e| ApplicationError::store(format!("upsert {} {}", kind, new_id), e))?;

        // step 7: derived index, failures logged and never rolled back
        if let Err(e) = self.linker.relink(kind, &new_id, &payload) {
            warn!("relink failed for {} {}: {}", kind, new_id, e);
        }

        // step 8
        let active = ActiveCapacity {
            id: new_id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
        };
        match self
            .store
            .set_active_capacity(new_owner_node_id, kind, active)
        {
            Ok(true) => {}
            Ok(false) => debug!("owner node {} not in store yet", new_owner_node_id),
            Err(e) => warn!(
                "active pointer update failed for node {}: {}",
                new_owner_node_id, e
            ),
        }

        // step 9
        ctx.cache.insert(kind, source_id, &new_id);

        Ok(CloneOutcome { new_id, payload })
    }

    /// Clone every capacity of *another* kind the payload references, and
    /// record each result in the matching identifier map so the owning
    /// payload's rewrite resolves them. Same-kind references resolve through
    /// the suffix fallback; the cache terminates cycles either way.
    fn clone_dependencies(
        &self,
        owner_kind: CapacityKind,
        payload: &Value,
        new_owner_node_id: &str,
        ctx: &mut CloneContext,
    ) -> ApplicationResult<()> {
        for reference in scan(payload) {
            let Some(kind) = reference.capacity_kind() else {
                continue;
            };
            if kind == owner_kind {
                continue;
            }
            let raw = reference.raw_id();
            let map = ctx.maps.map_for(kind);
            if map.contains_key(raw) || map.contains_key(strip_numeric_suffixes(raw)) {
                continue;
            }
            match self.clone_kind(kind, raw, new_owner_node_id, ctx) {
                Ok(outcome) => ctx.maps.record(kind, raw, &outcome.new_id),
                Err(ApplicationError::CapacityNotFound { kind, id }) => {
                    warn!(
                        "dependency {} {} missing, branch dropped, siblings continue",
                        kind, id
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Step 5 per kind: the plain two-pass rewrite for formulas, plus
    /// internal-id regeneration for conditions and the column/row treatment
    /// for tables. Structural failures degrade to the text rewrite unless
    /// strict mode is on.
    fn finalize_payload(
        &self,
        kind: CapacityKind,
        source: &Capacity,
        ctx: &CloneContext,
    ) -> ApplicationResult<Value> {
        let rewritten = rewrite_value(&source.payload, &ctx.maps, Some(ctx.suffix));
        match kind {
            CapacityKind::Formula => Ok(force_shared_suffixes(&rewritten, ctx.suffix)),
            CapacityKind::Condition => match condition::resuffix_internals(&rewritten, ctx.suffix)
            {
                Ok(restructured) => Ok(force_shared_suffixes(&restructured, ctx.suffix)),
                Err(e) => self.degraded(source, force_shared_suffixes(&rewritten, ctx.suffix), e),
            },
            CapacityKind::Table => {
                match table::rebuild_payload(&source.payload, &ctx.maps, ctx.suffix) {
                    Ok(rebuilt) => Ok(rebuilt),
                    Err(e) => {
                        self.degraded(source, force_shared_suffixes(&rewritten, ctx.suffix), e)
                    }
                }
            }
        }
    }

    fn degraded(
        &self,
        source: &Capacity,
        fallback: Value,
        err: DomainError,
    ) -> ApplicationResult<Value> {
        if self.strict_rewrite {
            return Err(err.into());
        }
        warn!(
            "rewrite degraded for {} {}: {}; persisting plain text rewrite",
            source.kind, source.id, err
        );
        Ok(fallback)
    }

    fn load_source(&self, kind: CapacityKind, source_id: &str) -> ApplicationResult<Capacity> {
        let base = strip_numeric_suffixes(source_id);
        self.find_capacity(kind, base)?
            .ok_or_else(|| ApplicationError::not_found(kind, base))
    }

    fn find_capacity(
        &self,
        kind: CapacityKind,
        id: &str,
    ) -> ApplicationResult<Option<Capacity>> {
        self.store
            .find_capacity(kind, id)
            .map_err(|e| ApplicationError::store(format!("load {} {}", kind, id), e))
    }
}
