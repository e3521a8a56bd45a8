//! Tests for formula cloning

use std::sync::Arc;

use serde_json::json;

use treecap::application::ApplicationError;
use treecap::domain::{Capacity, CapacityKind, Node};
use treecap::infrastructure::{MemoryStore, TreeStore};
use treecap::{CloneContext, CloneService};

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for id in ["node_src", "node_dst", "node_power-4", "node_area-4"] {
        store.upsert_node(Node::new(id)).unwrap();
    }
    store
        .upsert_capacity(
            Capacity::new(
                CapacityKind::Formula,
                "form_yield",
                "node_src",
                json!([
                    "@value.node_power",
                    "*",
                    "@value.node_area",
                    "*",
                    "@value.shared-ref-efficiency"
                ]),
            )
            .named("Rendement"),
        )
        .unwrap();
    store
}

#[test]
fn given_formula_when_cloning_then_tokens_are_rewritten_and_shared_refs_pinned() {
    let store = seeded_store();
    let service = CloneService::new(store.clone());
    let mut ctx = CloneContext::new(4);

    let outcome = service
        .clone_formula("form_yield", "node_dst", &mut ctx)
        .unwrap();

    assert_eq!(outcome.new_id, "form_yield-4");
    assert_eq!(
        outcome.payload,
        json!([
            "@value.node_power-4",
            "*",
            "@value.node_area-4",
            "*",
            "@value.shared-ref-efficiency-4"
        ])
    );
}

#[test]
fn given_mapped_shared_ref_when_cloning_then_mapping_wins_over_forced_suffix() {
    let store = seeded_store();
    let service = CloneService::new(store.clone());
    let mut ctx = CloneContext::new(4);
    ctx.maps
        .record_node("shared-ref-efficiency", "shared-ref-efficiency-9");

    let outcome = service
        .clone_formula("form_yield", "node_dst", &mut ctx)
        .unwrap();

    assert!(outcome
        .payload
        .as_array()
        .unwrap()
        .contains(&json!("@value.shared-ref-efficiency-9")));
}

#[test]
fn given_same_source_twice_in_one_operation_then_single_clone_is_reused() {
    let store = seeded_store();
    let service = CloneService::new(store.clone());
    let mut ctx = CloneContext::new(4);

    let first = service
        .clone_formula("form_yield", "node_dst", &mut ctx)
        .unwrap();
    let second = service
        .clone_formula("form_yield", "node_dst", &mut ctx)
        .unwrap();

    assert_eq!(first.new_id, second.new_id);
    assert_eq!(first.payload, second.payload);
    assert_eq!(ctx.cache.len(), 1);
}

#[test]
fn given_missing_source_when_cloning_then_not_found() {
    let store = Arc::new(MemoryStore::new());
    let service = CloneService::new(store);
    let mut ctx = CloneContext::new(4);

    let err = service
        .clone_formula("form_ghost", "node_dst", &mut ctx)
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::CapacityNotFound {
            kind: CapacityKind::Formula,
            ..
        }
    ));
    assert!(ctx.cache.is_empty());
}

#[test]
fn given_linked_nodes_when_cloning_then_formula_is_indexed_on_them() {
    let store = seeded_store();
    let service = CloneService::new(store.clone());
    let mut ctx = CloneContext::new(4);

    service
        .clone_formula("form_yield", "node_dst", &mut ctx)
        .unwrap();

    let power = store.find_node("node_power-4").unwrap().unwrap();
    assert!(power.linked_formula_ids.contains("form_yield-4"));
    let area = store.find_node("node_area-4").unwrap().unwrap();
    assert!(area.linked_formula_ids.contains("form_yield-4"));
}
