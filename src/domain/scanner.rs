//! Reference scanner
//!
//! Capacities do not point at each other through structured fields: every
//! reference is a substring inside the payload text. The scanner serializes
//! a payload to flat text and runs one ordered, classified pattern table over
//! it (leftmost-first alternation), recovering the implicit reference graph
//! in a single pass.
//!
//! Recognized vocabulary, in match order:
//!
//! 1. `@value.node-formula:ID` / `node-formula:ID`          -> Formula
//! 2. `@value.node-condition:ID` / `@value.condition:ID`
//!    / `node-condition:ID` / `condition:ID`                -> Condition
//! 3. `@value.node-table:ID` / `node-table:ID` / `@table.ID` -> Table
//! 4. `@value.shared-ref-ID` / bare `shared-ref-ID`         -> Shared
//! 5. `@value.UUID` / bare `UUID`                           -> Node
//! 6. `@value.node_ID` / bare `node_ID`                     -> Node
//!
//! Every id pattern tolerates a numeric suffix already present on the
//! identifier (a reference into an already-cloned payload); the suffix is
//! preserved as part of the raw id.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Match, Regex};
use serde_json::Value;

use crate::domain::entities::Reference;

static REFERENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

pub(crate) fn reference_pattern() -> &'static Regex {
    REFERENCE_PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
              (?:@value\.)? \b node-formula: (?P<formula>[A-Za-z0-9_-]+)
            | (?:@value\.)? \b (?:node-condition:|condition:) (?P<condition>[A-Za-z0-9_-]+)
            | (?: (?:@value\.)? \b node-table: | @table\. ) (?P<table>[A-Za-z0-9_-]+)
            | (?:@value\.)? \b (?P<shared>shared-ref-[A-Za-z0-9-]*[A-Za-z0-9])
            | (?:@value\.)? \b (?P<uuid>
                  [0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}
                  (?:-[0-9]+)*
              ) \b
            | (?:@value\.)? \b (?P<node>node_[A-Za-z0-9_-]*[A-Za-z0-9]) \b
            ",
        )
        .expect("reference pattern is valid")
    })
}

/// Map a pattern-table match to a classified reference plus the sub-match
/// holding the raw id (the rewriter needs its position to keep the prefix).
pub(crate) fn classify<'t>(caps: &Captures<'t>) -> Option<(Reference, Match<'t>)> {
    if let Some(m) = caps.name("formula") {
        return Some((Reference::Formula(m.as_str().to_string()), m));
    }
    if let Some(m) = caps.name("condition") {
        return Some((Reference::Condition(m.as_str().to_string()), m));
    }
    if let Some(m) = caps.name("table") {
        return Some((Reference::Table(m.as_str().to_string()), m));
    }
    if let Some(m) = caps.name("shared") {
        return Some((Reference::Shared(m.as_str().to_string()), m));
    }
    if let Some(m) = caps.name("uuid") {
        return Some((Reference::Node(m.as_str().to_string()), m));
    }
    if let Some(m) = caps.name("node") {
        return Some((Reference::Node(m.as_str().to_string()), m));
    }
    None
}

/// Extract every reference embedded in a flat text.
pub fn scan_text(text: &str) -> BTreeSet<Reference> {
    let mut refs = BTreeSet::new();
    for caps in reference_pattern().captures_iter(text) {
        if let Some((reference, _)) = classify(&caps) {
            refs.insert(reference);
        }
    }
    refs
}

/// Extract every reference embedded in a payload, deduplicated by
/// `(kind, raw id)`.
///
/// Pure and total: payloads that cannot be serialized yield an empty set.
pub fn scan(payload: &Value) -> BTreeSet<Reference> {
    match serde_json::to_string(payload) {
        Ok(text) => scan_text(&text),
        Err(_) => BTreeSet::new(),
    }
}
