//! Listing filters, case-insensitive statuses, graceful unknowns.

use shirokuma_e2e_tests::harness::TestDb;
use shirokuma_core::{
    CreateItemInput, ListItemsParams, Priority, SearchParams, SortBy, SortOrder,
};

fn seeded() -> TestDb {
    let db = TestDb::new();
    for (item_type, title, status, priority) in [
        ("issue", "broken login", "In Progress", Priority::High),
        ("issue", "slow dashboard", "Open", Priority::Medium),
        ("doc", "release notes", "Completed", Priority::Low),
    ] {
        db.store
            .create_item(CreateItemInput {
                status: Some(status.to_string()),
                priority: Some(priority),
                ..CreateItemInput::new(item_type, title)
            })
            .unwrap();
    }
    db
}

#[test]
fn case_insensitive_status_filter() {
    let db = seeded();
    let hits = db
        .store
        .list_items(&ListItemsParams {
            statuses: vec!["in progress".to_string()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "broken login");
}

#[test]
fn unknown_status_is_graceful() {
    let db = seeded();
    let hits = db
        .store
        .list_items(&ListItemsParams {
            statuses: vec!["in progress".to_string(), "NoSuchStatus".to_string()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(hits.len(), 1, "unknown names contribute no matches, no error");

    let none = db
        .store
        .list_items(&ListItemsParams {
            statuses: vec!["NoSuchStatus".to_string()],
            ..Default::default()
        })
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn search_status_or_group() {
    let db = seeded();
    let hits = db
        .store
        .search_items("status:Open status:Completed", &SearchParams::default())
        .unwrap();
    assert_eq!(hits.len(), 2);

    let hits = db
        .store
        .search_items(
            "status:Open status:NoSuchStatus",
            &SearchParams::default(),
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn priority_sort_and_closed_exclusion() {
    let db = seeded();
    let ranked = db
        .store
        .list_items(&ListItemsParams {
            sort_by: SortBy::Priority,
            sort_order: SortOrder::Asc,
            ..Default::default()
        })
        .unwrap();
    let priorities: Vec<Priority> = ranked.iter().map(|s| s.priority).collect();
    assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);

    let open_only = db
        .store
        .list_items(&ListItemsParams {
            include_closed_statuses: Some(false),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(open_only.len(), 2);
    assert!(open_only.iter().all(|s| s.status != "Completed"));
}

#[test]
fn type_filter_and_pagination() {
    let db = seeded();
    let issues = db
        .store
        .list_items(&ListItemsParams {
            item_type: Some("issue".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(issues.len(), 2);

    let paged = db
        .store
        .list_items(&ListItemsParams {
            limit: Some(1),
            offset: 1,
            sort_by: SortBy::Created,
            sort_order: SortOrder::Asc,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].title, "slow dashboard");
}
