//! Create an item, read it back, find it by search.

use shirokuma_e2e_tests::harness::TestDb;
use shirokuma_core::{Priority, SearchParams};

#[test]
fn create_and_retrieve() {
    let db = TestDb::new();

    let created = db.create(
        "issue",
        "Search test: JavaScript error",
        "Getting TypeError when calling undefined function in the payments module",
        &["javascript", "error", "bug"],
    );
    assert!(created.id >= 1);

    let fetched = db.store.get_item(created.id).unwrap();
    assert_eq!(fetched.title, "Search test: JavaScript error");
    assert_eq!(fetched.status.name, "Open");
    assert_eq!(fetched.priority, Priority::Medium);
    let mut tags = fetched.tags.clone();
    tags.sort();
    assert_eq!(tags, vec!["bug", "error", "javascript"]);

    let hits = db
        .store
        .search_items("JavaScript", &SearchParams::default())
        .unwrap();
    assert!(hits.iter().any(|s| s.id == created.id));

    let misses = db
        .store
        .search_items("nonexistentterm12345", &SearchParams::default())
        .unwrap();
    assert!(misses.iter().all(|s| s.id != created.id));
    assert!(misses.is_empty());
}

#[test]
fn response_never_leaks_internal_fields() {
    let db = TestDb::new();
    let item = db.create("knowledge", "embedding privacy", "internal blob handling", &[]);

    let as_json = serde_json::to_value(&item).unwrap();
    assert!(as_json.get("embedding").is_none());
    assert!(as_json.get("searchIndex").is_none());
    assert!(as_json.get("search_index").is_none());

    let summaries = db
        .store
        .search_items("embedding", &SearchParams::default())
        .unwrap();
    let as_json = serde_json::to_value(&summaries).unwrap();
    assert!(as_json[0].get("content").is_none());
    assert!(as_json[0].get("embedding").is_none());
}
