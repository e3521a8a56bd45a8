//! Identifier rewriter
//!
//! Rewrites a recovered reference to the identifier it should resolve to
//! after a clone. Resolution order is load-bearing:
//!
//! 1. an entry in the matching identifier map wins;
//! 2. a shared reference with no mapping passes through untouched (shared
//!    values are never invented);
//! 3. with a suffix supplied, the suffix-stripped base gets `-{suffix}`;
//! 4. otherwise the raw id passes through.
//!
//! Suffix application always strips existing trailing numeric runs first so
//! that re-cloning a clone yields `base-2`, never `base-1-2` stacked into
//! `base-1-1`-style garbage.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::entities::{CapacityKind, Reference};
use crate::domain::scanner::{classify, reference_pattern};

/// Caller-supplied old-id -> new-id mappings, one per capacity kind plus one
/// for nodes. Shared references resolve through the node map. Built
/// incrementally while dependencies are cloned; lives for exactly one
/// top-level clone operation.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMaps {
    pub nodes: HashMap<String, String>,
    pub formulas: HashMap<String, String>,
    pub conditions: HashMap<String, String>,
    pub tables: HashMap<String, String>,
}

impl IdentifierMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_for(&self, kind: CapacityKind) -> &HashMap<String, String> {
        match kind {
            CapacityKind::Condition => &self.conditions,
            CapacityKind::Formula => &self.formulas,
            CapacityKind::Table => &self.tables,
        }
    }

    /// Record a capacity mapping under both the id as it appeared in the
    /// payload and its suffix-stripped base, so later lookups hit either way.
    pub fn record(&mut self, kind: CapacityKind, old: &str, new: &str) {
        let map = match kind {
            CapacityKind::Condition => &mut self.conditions,
            CapacityKind::Formula => &mut self.formulas,
            CapacityKind::Table => &mut self.tables,
        };
        map.insert(old.to_string(), new.to_string());
        let base = strip_numeric_suffixes(old);
        if base != old {
            map.insert(base.to_string(), new.to_string());
        }
    }

    pub fn record_node(&mut self, old: &str, new: &str) {
        self.nodes.insert(old.to_string(), new.to_string());
    }

    fn lookup(&self, reference: &Reference) -> Option<&String> {
        let (map, id) = match reference {
            Reference::Node(id) | Reference::Shared(id) => (&self.nodes, id),
            Reference::Formula(id) => (&self.formulas, id),
            Reference::Condition(id) => (&self.conditions, id),
            Reference::Table(id) => (&self.tables, id),
        };
        map.get(id.as_str())
            .or_else(|| map.get(strip_numeric_suffixes(id)))
    }
}

/// Strip every trailing `-N` numeric run: `"form_1-1-2"` -> `"form_1"`.
pub fn strip_numeric_suffixes(id: &str) -> &str {
    let mut base = id;
    while let Some((head, tail)) = base.rsplit_once('-') {
        if head.is_empty() || tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        base = head;
    }
    base
}

/// Append the suffix to the suffix-stripped base of an identifier.
pub fn apply_suffix(id: &str, suffix: u32) -> String {
    format!("{}-{}", strip_numeric_suffixes(id), suffix)
}

fn has_numeric_suffix(id: &str) -> bool {
    strip_numeric_suffixes(id) != id
}

/// Resolve one reference through the maps, falling back to the suffix.
pub fn rewrite(reference: &Reference, maps: &IdentifierMaps, suffix: Option<u32>) -> String {
    if let Some(mapped) = maps.lookup(reference) {
        return mapped.clone();
    }
    let raw = reference.raw_id();
    if matches!(reference, Reference::Shared(_)) {
        return raw.to_string();
    }
    match suffix {
        Some(s) => apply_suffix(raw, s),
        None => raw.to_string(),
    }
}

/// Rewrite every embedded reference in a flat text, keeping each token's
/// vocabulary prefix (`@value.`, `node-formula:`, ...) intact.
pub fn rewrite_text(text: &str, maps: &IdentifierMaps, suffix: Option<u32>) -> String {
    reference_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let whole = caps.get(0).expect("match always has a whole capture");
            match classify(caps) {
                Some((reference, id_match)) => {
                    let prefix_len = id_match.start() - whole.start();
                    let prefix = &whole.as_str()[..prefix_len];
                    format!("{}{}", prefix, rewrite(&reference, maps, suffix))
                }
                None => whole.as_str().to_string(),
            }
        })
        .into_owned()
}

/// Rewrite every string in a payload, recursing through maps and sequences.
/// Object keys and non-string scalars pass through untouched.
pub fn rewrite_value(value: &Value, maps: &IdentifierMaps, suffix: Option<u32>) -> Value {
    match value {
        Value::String(s) => Value::String(rewrite_text(s, maps, suffix)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rewrite_value(item, maps, suffix))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, item)| (key.clone(), rewrite_value(item, maps, suffix)))
                .collect(),
        ),
        other => other.clone(),
    }
}

static SHARED_REF: OnceLock<Regex> = OnceLock::new();

fn shared_ref_pattern() -> &'static Regex {
    SHARED_REF
        .get_or_init(|| Regex::new(r"\bshared-ref-[A-Za-z0-9-]*[A-Za-z0-9]\b").expect("valid"))
}

/// Final forced pass of a clone operation: every shared reference that is
/// still unsuffixed gets the operation suffix, mapped or not. `rewrite`
/// deliberately leaves unmapped shared refs alone; only this pass, run once
/// the payload is otherwise final, pins them to the clone lineage.
pub fn force_shared_suffixes(value: &Value, suffix: u32) -> Value {
    match value {
        Value::String(s) => Value::String(force_shared_text(s, suffix)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| force_shared_suffixes(item, suffix))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, item)| (key.clone(), force_shared_suffixes(item, suffix)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn force_shared_text(text: &str, suffix: u32) -> String {
    shared_ref_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let id = caps.get(0).expect("whole capture").as_str();
            if has_numeric_suffix(id) {
                id.to_string()
            } else {
                format!("{}-{}", id, suffix)
            }
        })
        .into_owned()
}
