//! Tests for the identifier rewriter

use rstest::rstest;
use serde_json::json;

use treecap::domain::rewriter::{
    apply_suffix, force_shared_suffixes, rewrite, rewrite_text, rewrite_value,
    strip_numeric_suffixes,
};
use treecap::domain::Reference;
use treecap::IdentifierMaps;

fn maps_with_node(old: &str, new: &str) -> IdentifierMaps {
    let mut maps = IdentifierMaps::new();
    maps.record_node(old, new);
    maps
}

#[test]
fn given_mapped_reference_when_rewriting_then_map_wins_over_suffix() {
    let maps = maps_with_node("node_a", "node_z");
    let out = rewrite(&Reference::Node("node_a".into()), &maps, Some(9));
    assert_eq!(out, "node_z");
}

#[test]
fn given_unmapped_shared_reference_when_rewriting_then_unchanged() {
    // shared values are never invented, with or without a suffix on hand
    let maps = IdentifierMaps::new();
    let reference = Reference::Shared("shared-ref-tilt".into());
    assert_eq!(rewrite(&reference, &maps, Some(2)), "shared-ref-tilt");
    assert_eq!(rewrite(&reference, &maps, None), "shared-ref-tilt");
}

#[test]
fn given_mapped_shared_reference_when_rewriting_then_all_occurrences_agree() {
    let maps = maps_with_node("shared-ref-tilt", "shared-ref-tilt-7");
    let out = rewrite_text(
        "[\"@value.shared-ref-tilt\",\"+\",\"@value.shared-ref-tilt\"]",
        &maps,
        Some(2),
    );
    assert_eq!(
        out,
        "[\"@value.shared-ref-tilt-7\",\"+\",\"@value.shared-ref-tilt-7\"]"
    );
}

#[rstest]
#[case::bare_node("node_power", "node_power-2")]
#[case::bare_uuid(
    "9b2f0c1e-1111-2222-3333-0123456789ab",
    "9b2f0c1e-1111-2222-3333-0123456789ab-2"
)]
fn given_unmapped_reference_when_rewriting_then_suffix_fallback(
    #[case] raw: &str,
    #[case] expected: &str,
) {
    let out = rewrite(&Reference::Node(raw.into()), &IdentifierMaps::new(), Some(2));
    assert_eq!(out, expected);
}

#[test]
fn given_no_suffix_and_no_map_when_rewriting_then_unchanged() {
    let out = rewrite(
        &Reference::Formula("form_1".into()),
        &IdentifierMaps::new(),
        None,
    );
    assert_eq!(out, "form_1");
}

#[test]
fn given_suffixed_raw_id_when_rewriting_then_suffix_replaced_not_stacked() {
    let out = rewrite(
        &Reference::Node("node_power-1".into()),
        &IdentifierMaps::new(),
        Some(2),
    );
    assert_eq!(out, "node_power-2");
}

#[test]
fn given_map_keyed_by_base_when_raw_id_is_suffixed_then_map_still_hits() {
    // a reference into an already-cloned payload carries its old suffix
    let maps = maps_with_node("node_power", "node_power-5");
    let out = rewrite(&Reference::Node("node_power-1".into()), &maps, Some(2));
    assert_eq!(out, "node_power-5");
}

#[rstest]
#[case("form_1", "form_1")]
#[case("form_1-2", "form_1")]
#[case("form_1-1-2", "form_1")]
#[case("node_a-12", "node_a")]
#[case("shared-ref-tilt", "shared-ref-tilt")]
fn strip_numeric_suffixes_table(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(strip_numeric_suffixes(input), expected);
}

#[test]
fn apply_suffix_is_idempotent_per_suffix() {
    let once = apply_suffix("cond_1", 3);
    assert_eq!(once, "cond_1-3");
    assert_eq!(apply_suffix(&once, 3), "cond_1-3");
}

#[test]
fn given_nested_payload_when_rewriting_then_every_string_is_visited() {
    let payload = json!({
        "branches": [{
            "when": { "left": { "ref": "@value.node_power" } },
            "actions": [{ "nodeIds": ["node_detail", "node-formula:form_1"] }]
        }],
        "note": "depends on node_power",
        "threshold": 9000
    });
    let mut maps = IdentifierMaps::new();
    maps.record(
        treecap::domain::CapacityKind::Formula,
        "form_1",
        "form_1-2",
    );

    let out = rewrite_value(&payload, &maps, Some(2));
    assert_eq!(
        out["branches"][0]["when"]["left"]["ref"],
        "@value.node_power-2"
    );
    assert_eq!(
        out["branches"][0]["actions"][0]["nodeIds"],
        json!(["node_detail-2", "node-formula:form_1-2"])
    );
    assert_eq!(out["note"], "depends on node_power-2");
    assert_eq!(out["threshold"], 9000);
}

#[test]
fn forced_pass_pins_every_unsuffixed_shared_ref() {
    let payload = json!({
        "tokens": ["@value.shared-ref-tilt", "@value.node_power-2"],
        "meta": { "source": "shared-ref-area" }
    });
    let out = force_shared_suffixes(&payload, 2);
    assert_eq!(
        out["tokens"],
        json!(["@value.shared-ref-tilt-2", "@value.node_power-2"])
    );
    assert_eq!(out["meta"]["source"], "shared-ref-area-2");
}

#[test]
fn forced_pass_leaves_already_suffixed_shared_refs_alone() {
    let payload = json!(["@value.shared-ref-tilt-2"]);
    assert_eq!(force_shared_suffixes(&payload, 2), payload);
}
