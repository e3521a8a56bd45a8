//! Tests for the reference scanner

use rstest::rstest;
use serde_json::json;

use treecap::domain::scanner::{scan, scan_text};
use treecap::domain::Reference;

#[rstest]
#[case::value_formula("@value.node-formula:form_1", Reference::Formula("form_1".into()))]
#[case::bare_formula("node-formula:form_1", Reference::Formula("form_1".into()))]
#[case::value_node_condition("@value.node-condition:cond_1", Reference::Condition("cond_1".into()))]
#[case::value_condition("@value.condition:cond_1", Reference::Condition("cond_1".into()))]
#[case::bare_node_condition("node-condition:cond_1", Reference::Condition("cond_1".into()))]
#[case::bare_condition("condition:cond_1", Reference::Condition("cond_1".into()))]
#[case::value_table("@value.node-table:tbl_1", Reference::Table("tbl_1".into()))]
#[case::bare_table("node-table:tbl_1", Reference::Table("tbl_1".into()))]
#[case::at_table("@table.tbl_1", Reference::Table("tbl_1".into()))]
#[case::value_shared("@value.shared-ref-tilt", Reference::Shared("shared-ref-tilt".into()))]
#[case::bare_shared("shared-ref-tilt", Reference::Shared("shared-ref-tilt".into()))]
#[case::value_node("@value.node_power", Reference::Node("node_power".into()))]
#[case::bare_node("node_power", Reference::Node("node_power".into()))]
#[case::value_uuid(
    "@value.9b2f0c1e-1111-2222-3333-0123456789ab",
    Reference::Node("9b2f0c1e-1111-2222-3333-0123456789ab".into())
)]
#[case::bare_uuid(
    "9b2f0c1e-1111-2222-3333-0123456789ab",
    Reference::Node("9b2f0c1e-1111-2222-3333-0123456789ab".into())
)]
fn given_vocabulary_token_when_scanning_then_classified_by_kind(
    #[case] text: &str,
    #[case] expected: Reference,
) {
    let refs = scan_text(text);
    assert!(
        refs.contains(&expected),
        "expected {:?} in {:?}",
        expected,
        refs
    );
    assert_eq!(refs.len(), 1, "one token should yield one reference: {:?}", refs);
}

#[rstest]
#[case::suffixed_node("@value.node_power-2", Reference::Node("node_power-2".into()))]
#[case::suffixed_formula("node-formula:form_1-2", Reference::Formula("form_1-2".into()))]
#[case::suffixed_shared(
    "@value.shared-ref-tilt-2",
    Reference::Shared("shared-ref-tilt-2".into())
)]
#[case::suffixed_uuid(
    "9b2f0c1e-1111-2222-3333-0123456789ab-2",
    Reference::Node("9b2f0c1e-1111-2222-3333-0123456789ab-2".into())
)]
fn given_already_suffixed_token_when_scanning_then_suffix_stays_in_raw_id(
    #[case] text: &str,
    #[case] expected: Reference,
) {
    assert!(scan_text(text).contains(&expected));
}

#[test]
fn given_structured_payload_when_scanning_then_all_nesting_levels_are_seen() {
    let payload = json!({
        "mode": "first-match",
        "branches": [{
            "when": {
                "left": { "kind": "nodeValue", "ref": "@value.node_power" },
                "right": { "kind": "const", "value": 100 }
            },
            "actions": [{
                "type": "SHOW",
                "nodeIds": ["9b2f0c1e-1111-2222-3333-0123456789ab", "node-formula:form_1"]
            }]
        }],
        "tokens": ["@value.shared-ref-tilt", "+", "@table.tbl_rates"]
    });

    let refs = scan(&payload);
    assert!(refs.contains(&Reference::Node("node_power".into())));
    assert!(refs.contains(&Reference::Node(
        "9b2f0c1e-1111-2222-3333-0123456789ab".into()
    )));
    assert!(refs.contains(&Reference::Formula("form_1".into())));
    assert!(refs.contains(&Reference::Shared("shared-ref-tilt".into())));
    assert!(refs.contains(&Reference::Table("tbl_rates".into())));
    assert_eq!(refs.len(), 5);
}

#[test]
fn given_repeated_tokens_when_scanning_then_deduplicated_by_kind_and_raw_id() {
    let refs = scan_text("@value.node_power + node_power * @value.node_power");
    assert_eq!(refs.len(), 1);
}

#[test]
fn given_reference_free_payload_when_scanning_then_empty_set() {
    assert!(scan(&json!({ "label": "Puissance", "value": 42 })).is_empty());
    assert!(scan(&json!(null)).is_empty());
    assert!(scan_text("plain prose, no identifiers at all").is_empty());
}

#[test]
fn given_word_embedded_shapes_when_scanning_then_not_matched() {
    // node_ inside a longer word is not a node reference
    assert!(scan_text("mynode_powerhouse").is_empty());
}
