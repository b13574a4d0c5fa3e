//! Database migrations.
//!
//! Versioned schema definitions applied idempotently at open. Migration
//! artifacts live in the binary rather than next to the database file so a
//! deployed server is always able to bring an older file up to date.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: items, reference data, joins, relations, system state",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "System state context/checkpoint/metadata columns",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS statuses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    is_closable INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    priority TEXT NOT NULL DEFAULT 'MEDIUM',
    status_id INTEGER NOT NULL REFERENCES statuses(id),
    category TEXT,
    start_date TEXT,
    end_date TEXT,
    -- normalized NNNNN.NNNNN.NNNNN so string order = semver order
    version TEXT,

    -- AI-derived fields
    ai_summary TEXT,
    search_index TEXT,
    embedding BLOB,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_type ON items(type);
CREATE INDEX IF NOT EXISTS idx_items_status ON items(status_id);
CREATE INDEX IF NOT EXISTS idx_items_priority ON items(priority);
CREATE INDEX IF NOT EXISTS idx_items_created ON items(created_at);
CREATE INDEX IF NOT EXISTS idx_items_updated ON items(updated_at);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS item_tags (
    item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (item_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_item_tags_tag ON item_tags(tag_id);

CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS item_keywords (
    item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
    weight REAL NOT NULL CHECK (weight > 0 AND weight <= 1),
    PRIMARY KEY (item_id, keyword_id)
);

CREATE INDEX IF NOT EXISTS idx_item_keywords_keyword ON item_keywords(keyword_id);

CREATE TABLE IF NOT EXISTS concepts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS item_concepts (
    item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    concept_id INTEGER NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
    confidence REAL NOT NULL CHECK (confidence > 0 AND confidence <= 1),
    PRIMARY KEY (item_id, concept_id)
);

CREATE INDEX IF NOT EXISTS idx_item_concepts_concept ON item_concepts(concept_id);

-- Symmetric relations stored as two directed rows so either endpoint can
-- be the query root without OR-queries
CREATE TABLE IF NOT EXISTS item_relations (
    source_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    PRIMARY KEY (source_id, target_id)
);

CREATE INDEX IF NOT EXISTS idx_item_relations_target ON item_relations(target_id);

CREATE TABLE IF NOT EXISTS system_states (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    metrics TEXT NOT NULL DEFAULT '{}',
    tags TEXT NOT NULL DEFAULT '[]',
    related_items TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_system_states_active ON system_states(is_active);

-- Default workflow statuses
INSERT OR IGNORE INTO statuses (name, is_closable, sort_order) VALUES
    ('Open', 0, 1),
    ('Specification', 0, 2),
    ('Waiting', 0, 3),
    ('Ready', 0, 4),
    ('In Progress', 0, 5),
    ('Review', 0, 6),
    ('Testing', 0, 7),
    ('Pending', 0, 8),
    ('Completed', 1, 9),
    ('Closed', 1, 10),
    ('Canceled', 1, 11),
    ('Rejected', 1, 12);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: opaque session-continuity payloads on system state rows
const MIGRATION_V2_UP: &str = r#"
ALTER TABLE system_states ADD COLUMN context TEXT;
ALTER TABLE system_states ADD COLUMN checkpoint TEXT;
ALTER TABLE system_states ADD COLUMN metadata TEXT;

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // execute_batch handles the multi-statement SQL
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
