//! System-state roll-forward journey.

use shirokuma_e2e_tests::harness::TestDb;
use shirokuma_core::UpdateStateInput;

#[test]
fn state_roll_forward_keeps_history() {
    let db = TestDb::new();
    assert!(db.store.get_current_state().unwrap().is_none());

    let first = db
        .store
        .update_current_state(UpdateStateInput {
            content: "line1\nline2\nline3\nline4".to_string(),
            tags: vec!["state".to_string()],
            ..Default::default()
        })
        .unwrap();
    let second = db
        .store
        .update_current_state(UpdateStateInput {
            content: "line1\nline2\nline3\nline4".to_string(),
            tags: vec!["state".to_string()],
            ..Default::default()
        })
        .unwrap();

    let history = db.store.state_history(10).unwrap();
    assert_eq!(history.len(), 2);
    let active: Vec<_> = history.iter().filter(|s| s.is_active).collect();
    assert_eq!(active.len(), 1, "exactly one active row");
    assert_eq!(active[0].id, second.id);
    assert_ne!(first.id, second.id);

    let summary = &active[0].summary;
    assert!(summary.starts_with("line1 line2 line3"));
    assert!(!summary.contains("line4"));
    assert!(summary.chars().count() <= 200);
}

#[test]
fn state_metrics_reflect_the_graph() {
    let db = TestDb::new();
    let a = db.create("issue", "a", "", &[]);
    let b = db.create("issue", "b", "", &[]);
    db.create("issue", "isolated", "", &[]);
    db.store.add_relations(a.id, &[b.id]).unwrap();

    let state = db
        .store
        .update_current_state(UpdateStateInput {
            content: "metrics check".to_string(),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(state.metrics.total_items, 3);
    assert_eq!(state.metrics.total_relations, 1);
    assert_eq!(state.metrics.isolated_nodes, 1);
    assert_eq!(state.metrics.max_connections, 1);
    assert!((state.metrics.avg_connections - 2.0 / 3.0).abs() < 1e-9);
    assert!(state.metrics.timestamp <= chrono::Utc::now());
}

#[test]
fn prior_states_remain_queryable() {
    let db = TestDb::new();
    for i in 0..5 {
        db.store
            .update_current_state(UpdateStateInput {
                content: format!("session {i}"),
                ..Default::default()
            })
            .unwrap();
    }
    let history = db.store.state_history(10).unwrap();
    assert_eq!(history.len(), 5);
    // Newest first; only the newest is active
    assert!(history[0].is_active);
    assert!(history[1..].iter().all(|s| !s.is_active));
    assert_eq!(history[4].content, "session 0");
}
