//! Test database manager.
//!
//! Each test gets an isolated store in a temporary directory, optionally
//! with a Markdown mirror tree. Everything is deleted when the manager
//! drops.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use shirokuma_core::{Config, CreateItemInput, Item, Store};

/// Isolated store for one test.
pub struct TestDb {
    pub store: Store,
    /// Kept alive so the database files survive until the test ends
    _temp_dir: TempDir,
    export_dir: Option<PathBuf>,
}

impl TestDb {
    /// Store without a mirror.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store =
            Store::open(&Config::at(temp_dir.path().join("kb.db"))).expect("open test store");
        Self {
            store,
            _temp_dir: temp_dir,
            export_dir: None,
        }
    }

    /// Store with a Markdown mirror under the same temp directory.
    pub fn with_mirror() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let export_dir = temp_dir.path().join("export");
        let mut config = Config::at(temp_dir.path().join("kb.db"));
        config.export_dir = Some(export_dir.clone());
        let store = Store::open(&config).expect("open test store");
        Self {
            store,
            _temp_dir: temp_dir,
            export_dir: Some(export_dir),
        }
    }

    /// The mirror root. Panics when the store was opened without one.
    pub fn export_dir(&self) -> &Path {
        self.export_dir.as_deref().expect("mirror not enabled")
    }

    /// Shorthand for the common create call.
    pub fn create(&self, item_type: &str, title: &str, content: &str, tags: &[&str]) -> Item {
        self.store
            .create_item(CreateItemInput {
                content: content.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..CreateItemInput::new(item_type, title)
            })
            .expect("create item")
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}
