//! SQLite storage implementation.
//!
//! Uses separate reader/writer connections for interior mutability. All
//! methods take `&self`, making [`Store`] `Send + Sync` so the protocol
//! layer can hold `Arc<Store>` instead of `Arc<Mutex<Store>>`. The engine
//! serializes writes internally; busy errors are retried with backoff.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::config::Config;
use crate::enrich::{Enrichment, EnrichmentProvider, EnrichmentService};
use crate::error::{Result, ServiceError};
use crate::items::{Item, Priority, Status, WeightedConcept, WeightedKeyword, DEFAULT_STATUSES};
use crate::mirror::Mirror;
use crate::version::denormalize_version;

/// Write attempts before a busy error surfaces as `Transient`
const TX_MAX_ATTEMPTS: u32 = 3;
const TX_BACKOFF_BASE_MS: u64 = 25;

// ============================================================================
// STORE
// ============================================================================

/// The knowledge-base store.
///
/// Owns the database connections, the enrichment service, and the optional
/// file mirror. Service operations (item CRUD, search, related items,
/// system state, stats) are implemented as `impl Store` blocks in their
/// own modules.
pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    enricher: EnrichmentService,
    mirror: Option<Mirror>,
}

impl Store {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (or create) the store described by `config`.
    ///
    /// Applies pending migrations on the writer connection and seeds the
    /// default statuses when the table is empty.
    pub fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = Connection::open(&config.database_path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if config.database_path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&config.database_path, perms);
        }

        Self::configure_connection(&writer)?;
        if config.auto_migrate {
            super::migrations::apply_migrations(&writer)
                .map_err(|e| ServiceError::Internal(format!("migration failed: {e}")))?;
            seed_statuses(&writer)?;
        }

        let reader = Connection::open(&config.database_path)?;
        Self::configure_connection(&reader)?;

        let mirror = match &config.export_dir {
            Some(dir) => match Mirror::new(dir.clone()) {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!("export dir {} unusable, mirroring disabled: {e}", dir.display());
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            enricher: EnrichmentService::new(),
            mirror,
        })
    }

    /// Replace the enrichment provider (builder style).
    pub fn with_enrichment_provider(mut self, provider: Box<dyn EnrichmentProvider>) -> Self {
        self.enricher = EnrichmentService::with_provider(provider);
        self
    }

    pub(crate) fn enricher(&self) -> &EnrichmentService {
        &self.enricher
    }

    pub(crate) fn read(&self) -> Result<MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| ServiceError::Internal("reader lock poisoned".to_string()))
    }

    /// Run `f` inside a single transaction on the writer connection.
    ///
    /// Busy/locked failures roll back and retry up to [`TX_MAX_ATTEMPTS`]
    /// with exponential backoff; the closure must therefore be re-runnable.
    pub(crate) fn with_tx<T>(&self, f: impl Fn(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self
            .writer
            .lock()
            .map_err(|_| ServiceError::Internal("writer lock poisoned".to_string()))?;

        let mut attempt = 0u32;
        loop {
            let outcome: Result<T> = (|| {
                let tx = conn.transaction()?;
                let value = f(&tx)?;
                tx.commit()?;
                Ok(value)
            })();

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < TX_MAX_ATTEMPTS => {
                    let delay = Duration::from_millis(TX_BACKOFF_BASE_MS << attempt);
                    attempt += 1;
                    tracing::debug!("database busy, retrying write after {delay:?}");
                    std::thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    // ========================================================================
    // ITEM FETCH / DELETE
    // ========================================================================

    /// Fetch a fully hydrated item.
    pub fn get_item(&self, id: i64) -> Result<Item> {
        let conn = self.read()?;
        read_item(&conn, id)
    }

    /// Remove an item; joins and both directions of its relations cascade.
    pub fn delete_item(&self, id: i64) -> Result<()> {
        let (item_type, title) = self.with_tx(|tx| {
            let meta: Option<(String, String)> = tx
                .query_row(
                    "SELECT type, title FROM items WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let meta = meta.ok_or_else(|| ServiceError::NotFound(format!("item {id}")))?;
            tx.execute("DELETE FROM items WHERE id = ?1", params![id])?;
            Ok(meta)
        })?;

        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.remove_item(&item_type, id, &title) {
                tracing::warn!("mirror removal failed for item {id}: {err}");
            }
        }
        Ok(())
    }

    // ========================================================================
    // MIRROR HELPERS (best-effort, post-commit)
    // ========================================================================

    pub(crate) fn mirror_item(&self, item: &Item, old_title: Option<&str>) {
        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.write_item(item, old_title) {
                tracing::warn!("mirror write failed for item {}: {err}", item.id);
            }
        }
    }

    pub(crate) fn mirror_state(&self, state: &crate::state::SystemState) {
        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.write_state(state) {
                tracing::warn!("mirror write failed for state {}: {err}", state.id);
            }
        }
    }
}

/// Seed the 12 default statuses when the table is empty (covers databases
/// whose reference data was wiped outside migrations).
fn seed_statuses(conn: &Connection) -> Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM statuses", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }
    tracing::info!("seeding {} default statuses", DEFAULT_STATUSES.len());
    for (order, (name, is_closable)) in DEFAULT_STATUSES.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO statuses (name, is_closable, sort_order) VALUES (?1, ?2, ?3)",
            params![name, *is_closable as i64, order as i64 + 1],
        )?;
    }
    Ok(())
}

// ============================================================================
// REFERENCE-DATA HELPERS
// ============================================================================

/// Resolve a status name to its id: exact-case first, then a
/// case-insensitive fallback, then `NotFound`.
pub(crate) fn status_id(conn: &Connection, name: &str) -> Result<i64> {
    lookup_status_id(conn, name)?
        .ok_or_else(|| ServiceError::NotFound(format!("status '{name}'")))
}

/// Graceful variant of [`status_id`] for filter paths: unknown names
/// resolve to `None` instead of failing.
pub(crate) fn lookup_status_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    if let Some(id) = conn
        .query_row(
            "SELECT id FROM statuses WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
    {
        return Ok(Some(id));
    }
    Ok(conn
        .query_row(
            "SELECT id FROM statuses WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |row| row.get(0),
        )
        .optional()?)
}

/// Get-or-create tags by name (case-sensitive; normalization is
/// caller-side). Returns ids in input order, duplicates collapsed.
pub(crate) fn ensure_tags(conn: &Connection, names: &[String]) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        if name.is_empty() {
            continue;
        }
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;
        let id: i64 = conn.query_row(
            "SELECT id FROM tags WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn ensure_keyword(conn: &Connection, word: &str) -> Result<i64> {
    conn.execute("INSERT OR IGNORE INTO keywords (word) VALUES (?1)", params![word])?;
    Ok(conn.query_row(
        "SELECT id FROM keywords WHERE word = ?1",
        params![word],
        |row| row.get(0),
    )?)
}

fn ensure_concept(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT OR IGNORE INTO concepts (name) VALUES (?1)", params![name])?;
    Ok(conn.query_row(
        "SELECT id FROM concepts WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?)
}

pub(crate) fn item_exists(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM items WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

// ============================================================================
// RELATION HELPERS
// ============================================================================

/// Insert both directed rows for the unordered pair `{a, b}`. Idempotent.
pub(crate) fn insert_relation_pair(conn: &Connection, a: i64, b: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO item_relations (source_id, target_id) VALUES (?1, ?2)",
        params![a, b],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO item_relations (source_id, target_id) VALUES (?1, ?2)",
        params![b, a],
    )?;
    Ok(())
}

/// Delete both directed rows for the unordered pair `{a, b}`.
pub(crate) fn delete_relation_pair(conn: &Connection, a: i64, b: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM item_relations
         WHERE (source_id = ?1 AND target_id = ?2) OR (source_id = ?2 AND target_id = ?1)",
        params![a, b],
    )?;
    Ok(())
}

pub(crate) fn related_ids(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT target_id FROM item_relations WHERE source_id = ?1 ORDER BY target_id",
    )?;
    let ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

// ============================================================================
// ENRICHMENT JOIN HELPERS
// ============================================================================

/// Insert keyword and concept joins for an item from an enrichment tuple.
pub(crate) fn insert_enrichment_joins(
    conn: &Connection,
    item_id: i64,
    enrichment: &Enrichment,
) -> Result<()> {
    for (word, weight) in &enrichment.keywords {
        let keyword_id = ensure_keyword(conn, word)?;
        conn.execute(
            "INSERT OR REPLACE INTO item_keywords (item_id, keyword_id, weight) VALUES (?1, ?2, ?3)",
            params![item_id, keyword_id, *weight as f64],
        )?;
    }
    for (name, confidence) in &enrichment.concepts {
        let concept_id = ensure_concept(conn, name)?;
        conn.execute(
            "INSERT OR REPLACE INTO item_concepts (item_id, concept_id, confidence) VALUES (?1, ?2, ?3)",
            params![item_id, concept_id, *confidence as f64],
        )?;
    }
    Ok(())
}

/// Remove all keyword and concept joins for an item (before re-enrichment).
pub(crate) fn clear_enrichment_joins(conn: &Connection, item_id: i64) -> Result<()> {
    conn.execute("DELETE FROM item_keywords WHERE item_id = ?1", params![item_id])?;
    conn.execute("DELETE FROM item_concepts WHERE item_id = ?1", params![item_id])?;
    Ok(())
}

// ============================================================================
// HYDRATION
// ============================================================================

pub(crate) fn item_tag_names(conn: &Connection, id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM item_tags it JOIN tags t ON t.id = it.tag_id
         WHERE it.item_id = ?1 ORDER BY t.name",
    )?;
    let names = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn item_keywords(conn: &Connection, id: i64) -> Result<Vec<WeightedKeyword>> {
    let mut stmt = conn.prepare(
        "SELECT k.word, ik.weight FROM item_keywords ik JOIN keywords k ON k.id = ik.keyword_id
         WHERE ik.item_id = ?1 ORDER BY ik.weight DESC, k.word",
    )?;
    let rows = stmt
        .query_map(params![id], |row| {
            Ok(WeightedKeyword {
                word: row.get(0)?,
                weight: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn item_concepts(conn: &Connection, id: i64) -> Result<Vec<WeightedConcept>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, ic.confidence FROM item_concepts ic JOIN concepts c ON c.id = ic.concept_id
         WHERE ic.item_id = ?1 ORDER BY ic.confidence DESC, c.name",
    )?;
    let rows = stmt
        .query_map(params![id], |row| {
            Ok(WeightedConcept {
                name: row.get(0)?,
                confidence: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Fetch and hydrate a full item, joins included. Works on any connection
/// (including inside a transaction).
pub(crate) fn read_item(conn: &Connection, id: i64) -> Result<Item> {
    struct Row {
        item_type: String,
        title: String,
        description: String,
        content: String,
        priority: String,
        category: Option<String>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        version: Option<String>,
        ai_summary: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        status: Status,
    }

    let row: Option<Row> = conn
        .query_row(
            "SELECT i.type, i.title, i.description, i.content, i.priority,
                    i.category, i.start_date, i.end_date, i.version, i.ai_summary,
                    i.created_at, i.updated_at,
                    s.id, s.name, s.is_closable, s.sort_order
             FROM items i JOIN statuses s ON s.id = i.status_id
             WHERE i.id = ?1",
            params![id],
            |row| {
                Ok(Row {
                    item_type: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    content: row.get(3)?,
                    priority: row.get(4)?,
                    category: row.get(5)?,
                    start_date: row.get(6)?,
                    end_date: row.get(7)?,
                    version: row.get(8)?,
                    ai_summary: row.get(9)?,
                    created_at: row.get(10)?,
                    updated_at: row.get(11)?,
                    status: Status {
                        id: row.get(12)?,
                        name: row.get(13)?,
                        is_closable: row.get(14)?,
                        sort_order: row.get(15)?,
                    },
                })
            },
        )
        .optional()?;

    let row = row.ok_or_else(|| ServiceError::NotFound(format!("item {id}")))?;
    let priority = Priority::parse_name(&row.priority)
        .ok_or_else(|| ServiceError::Internal(format!("corrupt priority '{}'", row.priority)))?;

    Ok(Item {
        id,
        item_type: row.item_type,
        title: row.title,
        description: row.description,
        content: row.content,
        priority,
        status: row.status,
        category: row.category,
        start_date: row.start_date,
        end_date: row.end_date,
        version: row.version.as_deref().map(denormalize_version),
        tags: item_tag_names(conn, id)?,
        keywords: item_keywords(conn, id)?,
        concepts: item_concepts(conn, id)?,
        related: related_ids(conn, id)?,
        ai_summary: row.ai_summary,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Internal enrichment fields for an item, used by the related-item engine
/// and the re-enrichment invariants. Not exposed through the API surface.
pub(crate) fn item_embedding(conn: &Connection, id: i64) -> Result<Option<Vec<u8>>> {
    Ok(conn
        .query_row(
            "SELECT embedding FROM items WHERE id = ?1",
            params![id],
            |row| row.get::<_, Option<Vec<u8>>>(0),
        )
        .optional()?
        .flatten())
}
