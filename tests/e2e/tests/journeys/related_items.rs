//! Graph and hybrid related-item journeys.

use shirokuma_e2e_tests::harness::TestDb;
use shirokuma_core::{HybridWeights, RelatedParams, Strategy};

#[test]
fn hybrid_ranking_by_shared_keyword_weight() {
    let db = TestDb::new();
    let query = db.create("issue", "security hardening", "", &[]);
    let strong = db.create("issue", "security checklist", "", &[]);
    let weak = db.create(
        "issue",
        "deployment notes",
        "please run a security review before the next deploy window opens",
        &[],
    );
    let unrelated = db.create("doc", "chocolate cake recipe", "flour sugar cocoa butter", &[]);

    let result = db
        .store
        .get_related_items(
            query.id,
            &RelatedParams {
                strategy: Some(Strategy::Hybrid),
                weights: Some(HybridWeights {
                    keywords: 1.0,
                    concepts: 0.0,
                    embedding: 0.0,
                }),
                limit: Some(10),
                ..Default::default()
            },
        )
        .unwrap();

    let ids: Vec<i64> = result.items.iter().map(|i| i.item.id).collect();
    assert_eq!(
        ids,
        vec![strong.id, weak.id],
        "descending keyword-overlap order; the unrelated item is absent"
    );
    assert!(!ids.contains(&unrelated.id));

    // Scores descend and every edge pairs the query with a result
    let scores: Vec<f64> = result
        .items
        .iter()
        .map(|i| i.search_score.unwrap())
        .collect();
    assert!(scores[0] > scores[1]);
    for (edge, item) in result.edges.iter().zip(&result.items) {
        assert_eq!(edge.source, query.id);
        assert_eq!(edge.target, item.item.id);
    }
}

#[test]
fn bidirectional_relation_roundtrip() {
    let db = TestDb::new();
    let a = db.create("issue", "a", "", &[]);
    let b = db.create("issue", "b", "", &[]);

    db.store.add_relations(a.id, &[b.id]).unwrap();
    let from_b = db
        .store
        .get_related_items(b.id, &RelatedParams::default())
        .unwrap();
    assert_eq!(from_b.items.len(), 1);
    assert_eq!(from_b.items[0].item.id, a.id);

    // Idempotent: repeating the call leaves exactly one pair
    db.store.add_relations(a.id, &[b.id]).unwrap();
    db.store.add_relations(b.id, &[a.id]).unwrap();
    let from_a = db
        .store
        .get_related_items(a.id, &RelatedParams::default())
        .unwrap();
    assert_eq!(from_a.items.len(), 1);
    assert_eq!(from_a.edges.len(), 1);
}

#[test]
fn graph_depth_expansion() {
    let db = TestDb::new();
    let a = db.create("issue", "a", "", &[]);
    let b = db.create("issue", "b", "", &[]);
    let c = db.create("issue", "c", "", &[]);
    let d = db.create("issue", "d", "", &[]);
    db.store.add_relations(a.id, &[b.id]).unwrap();
    db.store.add_relations(b.id, &[c.id]).unwrap();
    db.store.add_relations(c.id, &[d.id]).unwrap();

    for (depth, expected) in [(1, 1), (2, 2), (3, 3)] {
        let result = db
            .store
            .get_related_items(
                a.id,
                &RelatedParams {
                    depth: Some(depth),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.items.len(), expected, "depth {depth}");
        assert_eq!(result.edges.len(), expected, "chain has one edge per hop");
    }
}

#[test]
fn embedding_strategy_never_fails_on_disjoint_items() {
    let db = TestDb::new();
    let query = db.create("note", "rust borrow checker", "ownership and lifetimes", &[]);
    db.create("note", "gardening tips", "tomatoes need full sun", &[]);

    // Disjoint vocabularies: the call still succeeds, results are just
    // whatever clears the zero-score cut
    let result = db
        .store
        .get_related_items(
            query.id,
            &RelatedParams {
                strategy: Some(Strategy::Embedding),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(result.items.iter().all(|i| i.search_score.unwrap() > 0.0));
}
