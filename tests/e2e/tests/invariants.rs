//! Universal invariants checked through the public API.

use shirokuma_e2e_tests::harness::TestDb;
use shirokuma_core::{
    dequantize, normalize_version, quantize, RelatedParams, UpdateItemInput, UpdateStateInput,
};

/// Every relation is symmetric: j ∈ related(i) ⇒ i ∈ related(j).
#[test]
fn relations_are_symmetric() {
    let db = TestDb::new();
    let ids: Vec<i64> = (0..5)
        .map(|i| db.create("issue", &format!("node {i}"), "", &[]).id)
        .collect();
    db.store.add_relations(ids[0], &[ids[1], ids[2]]).unwrap();
    db.store.add_relations(ids[3], &[ids[0], ids[4]]).unwrap();
    db.store
        .update_item(UpdateItemInput {
            related: Some(vec![ids[2], ids[4]]),
            ..UpdateItemInput::for_id(ids[1])
        })
        .unwrap();

    for &i in &ids {
        for j in db.store.get_item(i).unwrap().related {
            assert!(
                db.store.get_item(j).unwrap().related.contains(&i),
                "relation {i} -> {j} must exist in both directions"
            );
        }
    }
}

/// Keyword weights and concept confidences stay in (0, 1].
#[test]
fn join_weights_are_bounded() {
    let db = TestDb::new();
    let item = db.create(
        "knowledge",
        "bounded weights",
        "weights weights weights and confidences stay bounded across repeated terms terms terms",
        &[],
    );
    assert!(!item.keywords.is_empty());
    for keyword in &item.keywords {
        assert!(keyword.weight > 0.0 && keyword.weight <= 1.0);
    }
    for concept in &item.concepts {
        assert!(concept.confidence > 0.0 && concept.confidence <= 1.0);
    }
}

/// At most one active state, across many transitions.
#[test]
fn single_active_state() {
    let db = TestDb::new();
    for i in 0..4 {
        db.store
            .update_current_state(UpdateStateInput {
                content: format!("round {i}"),
                ..Default::default()
            })
            .unwrap();
        let active = db
            .store
            .state_history(50)
            .unwrap()
            .into_iter()
            .filter(|s| s.is_active)
            .count();
        assert_eq!(active, 1);
    }
}

/// Deletion leaves no reachable trace of the item.
#[test]
fn delete_leaves_no_dangling_references() {
    let db = TestDb::new();
    let a = db.create("issue", "doomed", "has keywords and content", &["tag1"]);
    let b = db.create("issue", "survivor", "", &[]);
    db.store.add_relations(a.id, &[b.id]).unwrap();

    db.store.delete_item(a.id).unwrap();

    assert!(db.store.get_item(a.id).is_err());
    assert!(db.store.get_item(b.id).unwrap().related.is_empty());
    let neighborhood = db
        .store
        .get_related_items(b.id, &RelatedParams::default())
        .unwrap();
    assert!(neighborhood.items.is_empty());
    assert!(neighborhood.edges.is_empty());
}

/// Version normalization is stable and string order equals semver order.
#[test]
fn version_normalization_orders_like_semver() {
    let versions = ["0.1.0", "0.10.0", "1.0.0", "1.2.9", "1.2.10", "10.0.0"];
    let mut normalized: Vec<String> = versions
        .iter()
        .map(|v| normalize_version(v).unwrap())
        .collect();
    for v in &versions {
        assert_eq!(
            normalize_version(v).unwrap(),
            normalize_version(v).unwrap(),
            "normalization is deterministic"
        );
    }
    let sorted_input = normalized.clone();
    normalized.sort();
    assert_eq!(normalized, sorted_input, "semver order survives string sort");
}

/// Quantization round-trip error stays within 1/127 per component.
#[test]
fn embedding_round_trip_error_bound() {
    let vector: Vec<f32> = (0..128).map(|i| ((i as f32) / 127.0) * 2.0 - 1.0).collect();
    let restored = dequantize(&quantize(&vector));
    assert_eq!(restored.len(), 128);
    for (before, after) in vector.iter().zip(&restored) {
        assert!((before - after).abs() <= 1.0 / 127.0 + f32::EPSILON);
    }
}

/// Graph-mode neighborhoods are symmetric under the relation.
#[test]
fn graph_neighborhoods_are_symmetric() {
    let db = TestDb::new();
    let a = db.create("issue", "a", "", &[]);
    let b = db.create("issue", "b", "", &[]);
    let c = db.create("issue", "c", "", &[]);
    db.store.add_relations(a.id, &[b.id, c.id]).unwrap();

    for &(from, to) in &[(a.id, b.id), (b.id, a.id), (a.id, c.id), (c.id, a.id)] {
        let items: Vec<i64> = db
            .store
            .get_related_items(from, &RelatedParams::default())
            .unwrap()
            .items
            .iter()
            .map(|i| i.item.id)
            .collect();
        assert!(items.contains(&to), "{to} reachable from {from}");
    }
}
