//! Table cloning
//!
//! A table payload is a column/row/cell set plus lookup metadata. Cell data
//! is scalar and copied verbatim; only the metadata participates in
//! reference rewriting. Column and row ids are capacity-internal and get
//! the operation suffix. Column names need one repair: purely numeric
//! headers are data, not identifiers, so a `"5-1"` left over from an
//! earlier clone is renormalized back to `"5"` instead of visually
//! accumulating suffixes; textual names (`"Orientation-1"`) are kept.

use serde_json::{Map, Value};

use crate::application::context::CloneContext;
use crate::application::services::{CloneOutcome, CloneService};
use crate::application::ApplicationResult;
use crate::domain::rewriter::{
    apply_suffix, force_shared_suffixes, rewrite_value, IdentifierMaps,
};
use crate::domain::{CapacityKind, DomainError, DomainResult};

impl CloneService {
    /// Clone a table onto `new_owner_node_id`, columns, rows and cells
    /// included, recursively cloning the conditions and formulas its
    /// metadata references.
    pub fn clone_table(
        &self,
        source_id: &str,
        new_owner_node_id: &str,
        ctx: &mut CloneContext,
    ) -> ApplicationResult<CloneOutcome> {
        self.clone_kind(CapacityKind::Table, source_id, new_owner_node_id, ctx)
    }
}

/// Build the cloned table payload from the source: metadata rewritten like
/// any other payload, columns and rows copied verbatim apart from their ids
/// and the numeric-name repair.
pub(crate) fn rebuild_payload(
    source: &Value,
    maps: &IdentifierMaps,
    suffix: u32,
) -> DomainResult<Value> {
    let Value::Object(fields) = source else {
        return Err(DomainError::PayloadShape {
            reason: "table payload is not a column/row set object".into(),
        });
    };

    let mut out = Map::new();
    for (key, value) in fields {
        let rebuilt = match key.as_str() {
            "columns" => rebuild_columns(value, suffix)?,
            "rows" => rebuild_rows(value, suffix)?,
            _ => force_shared_suffixes(&rewrite_value(value, maps, Some(suffix)), suffix),
        };
        out.insert(key.clone(), rebuilt);
    }
    Ok(Value::Object(out))
}

fn rebuild_columns(value: &Value, suffix: u32) -> DomainResult<Value> {
    let Value::Array(columns) = value else {
        return Err(DomainError::PayloadShape {
            reason: "table columns is not a sequence".into(),
        });
    };
    let rebuilt = columns
        .iter()
        .map(|column| {
            let Value::Object(fields) = column else {
                return column.clone();
            };
            let mut out = fields.clone();
            if let Some(Value::String(id)) = fields.get("id") {
                out.insert("id".into(), Value::String(apply_suffix(id, suffix)));
            }
            if let Some(Value::String(name)) = fields.get("name") {
                out.insert(
                    "name".into(),
                    Value::String(renormalize_column_name(name).to_string()),
                );
            }
            Value::Object(out)
        })
        .collect();
    Ok(Value::Array(rebuilt))
}

fn rebuild_rows(value: &Value, suffix: u32) -> DomainResult<Value> {
    let Value::Array(rows) = value else {
        return Err(DomainError::PayloadShape {
            reason: "table rows is not a sequence".into(),
        });
    };
    let rebuilt = rows
        .iter()
        .map(|row| {
            let Value::Object(fields) = row else {
                return row.clone();
            };
            let mut out = fields.clone();
            if let Some(Value::String(id)) = fields.get("id") {
                out.insert("id".into(), Value::String(apply_suffix(id, suffix)));
            }
            Value::Object(out)
        })
        .collect();
    Ok(Value::Array(rebuilt))
}

/// `"5-1"` / `"5-1-2"` -> `"5"`; `"5"` and textual names pass through.
fn renormalize_column_name(name: &str) -> &str {
    let mut segments = name.split('-');
    let Some(first) = segments.next() else {
        return name;
    };
    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return name;
    }
    let mut saw_suffix = false;
    for segment in segments {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return name;
        }
        saw_suffix = true;
    }
    if saw_suffix {
        first
    } else {
        name
    }
}
