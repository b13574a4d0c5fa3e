//! Enrichment recomputation rules across updates.

use shirokuma_e2e_tests::harness::TestDb;
use shirokuma_core::{Priority, UpdateItemInput};

#[test]
fn content_update_triggers_re_enrichment() {
    let db = TestDb::new();
    let item = db.create(
        "issue",
        "Search test: JavaScript error",
        "Getting TypeError when calling undefined function",
        &["javascript", "error", "bug"],
    );
    let keywords_before: Vec<String> = item.keywords.iter().map(|k| k.word.clone()).collect();
    assert!(!keywords_before.is_empty());

    let updated = db
        .store
        .update_item(UpdateItemInput {
            content: Some("Updated: now also about typescript and compilers".to_string()),
            ..UpdateItemInput::for_id(item.id)
        })
        .unwrap();
    let keywords_after: Vec<String> = updated.keywords.iter().map(|k| k.word.clone()).collect();

    assert_ne!(keywords_before, keywords_after);
    assert!(keywords_after.iter().any(|w| w == "typescript"));

    // Re-reading gives exactly the same set: no stale joins survive
    let reread = db.store.get_item(item.id).unwrap();
    let rereread: Vec<String> = reread.keywords.iter().map(|k| k.word.clone()).collect();
    assert_eq!(keywords_after, rereread);
}

#[test]
fn field_only_update_preserves_enrichment_bytes() {
    let db = TestDb::new();
    let item = db.create(
        "issue",
        "Search test: JavaScript error",
        "Getting TypeError when calling undefined function",
        &["javascript", "error", "bug"],
    );

    let updated = db
        .store
        .update_item(UpdateItemInput {
            priority: Some(Priority::High),
            tags: Some(vec!["javascript".to_string(), "error".to_string()]),
            ..UpdateItemInput::for_id(item.id)
        })
        .unwrap();

    assert_eq!(updated.priority, Priority::High);
    assert!(!updated.tags.contains(&"bug".to_string()));
    assert_eq!(updated.ai_summary, item.ai_summary);
    assert_eq!(updated.keywords, item.keywords);
    assert_eq!(updated.concepts, item.concepts);
}

#[test]
fn title_only_update_also_re_enriches() {
    let db = TestDb::new();
    let item = db.create("note", "original topic", "body stays the same", &[]);

    let updated = db
        .store
        .update_item(UpdateItemInput {
            title: Some("kubernetes migration".to_string()),
            ..UpdateItemInput::for_id(item.id)
        })
        .unwrap();
    assert!(updated.keywords.iter().any(|k| k.word == "kubernetes"));
    assert!(updated.keywords.iter().all(|k| k.word != "original"));
}

#[test]
fn enrichment_is_deterministic_for_identical_inputs() {
    let db = TestDb::new();
    let a = db.create("note", "cache invalidation", "hard problems in cs", &[]);
    let b = db.create("note", "cache invalidation", "hard problems in cs", &[]);
    assert_eq!(a.keywords, b.keywords);
    assert_eq!(a.concepts, b.concepts);
    assert_eq!(a.ai_summary, b.ai_summary);
}
