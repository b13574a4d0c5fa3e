//! Markdown mirror journeys.

use shirokuma_e2e_tests::harness::TestDb;
use shirokuma_core::{UpdateItemInput, UpdateStateInput};

#[test]
fn mirror_file_exists_with_matching_frontmatter() {
    let db = TestDb::with_mirror();
    let item = db.create("issue", "Mirror me", "body of the mirrored item", &["fs"]);

    let path = db
        .export_dir()
        .join(format!("issue/{}-Mirror_me.md", item.id));
    let text = std::fs::read_to_string(&path).expect("mirror file written");

    // Frontmatter block parses back and matches the stored row
    let yaml = text
        .strip_prefix("---\n")
        .and_then(|rest| rest.split_once("---\n"))
        .map(|(front, _)| front)
        .expect("frontmatter block");
    let front: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(front["id"].as_i64(), Some(item.id));
    assert_eq!(front["type"].as_str(), Some("issue"));
    assert_eq!(front["title"].as_str(), Some("Mirror me"));
    assert!(text.contains("body of the mirrored item"));
}

#[test]
fn rename_moves_the_mirror_file() {
    let db = TestDb::with_mirror();
    let item = db.create("issue", "first name", "", &[]);
    let old_path = db
        .export_dir()
        .join(format!("issue/{}-first_name.md", item.id));
    assert!(old_path.exists());

    db.store
        .update_item(UpdateItemInput {
            title: Some("second name".to_string()),
            ..UpdateItemInput::for_id(item.id)
        })
        .unwrap();

    assert!(!old_path.exists(), "old file removed on rename");
    assert!(db
        .export_dir()
        .join(format!("issue/{}-second_name.md", item.id))
        .exists());
}

#[test]
fn delete_removes_the_mirror_file() {
    let db = TestDb::with_mirror();
    let item = db.create("issue", "short lived", "", &[]);
    let path = db
        .export_dir()
        .join(format!("issue/{}-short_lived.md", item.id));
    assert!(path.exists());

    db.store.delete_item(item.id).unwrap();
    assert!(!path.exists());
}

#[test]
fn state_writes_land_under_system_tree() {
    let db = TestDb::with_mirror();
    let state = db
        .store
        .update_current_state(UpdateStateInput {
            content: "session notes".to_string(),
            tags: vec!["state".to_string()],
            ..Default::default()
        })
        .unwrap();

    let path = db
        .export_dir()
        .join(format!(".system/current_state/{}.md", state.id));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("session notes"));
    assert!(text.contains("totalItems"));
}

#[test]
fn writes_succeed_without_a_mirror() {
    let db = TestDb::new();
    let item = db.create("issue", "no mirror configured", "", &[]);
    assert!(db.store.get_item(item.id).is_ok());
}
