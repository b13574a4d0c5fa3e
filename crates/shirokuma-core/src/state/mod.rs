//! System-state singleton.
//!
//! A history table with at most one `is_active` row. Updating the current
//! state deactivates the previous row, snapshots graph metrics, derives a
//! short summary, and inserts a fresh active row - one transaction, history
//! preserved.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::storage::Store;

/// Summary length ceiling in characters
const SUMMARY_CHARS: usize = 200;
/// Lines of content that feed the summary
const SUMMARY_LINES: usize = 3;

/// Graph metrics snapshot taken at each state write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMetrics {
    pub total_items: i64,
    /// Undirected relation count
    pub total_relations: i64,
    /// `2 * relations / items`
    pub avg_connections: f64,
    pub max_connections: i64,
    /// Items with no relations at all
    pub isolated_nodes: i64,
    pub timestamp: DateTime<Utc>,
}

/// A system-state row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub id: i64,
    pub version: String,
    pub content: String,
    /// First 200 chars of the first three content lines
    pub summary: String,
    pub metrics: StateMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    pub tags: Vec<String>,
    pub related_items: Vec<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `update_current_state`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateStateInput {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Opaque JSON payloads carried through untouched
    pub metadata: Option<String>,
    pub context: Option<String>,
    pub checkpoint: Option<String>,
    #[serde(default)]
    pub related_items: Vec<i64>,
}

impl Store {
    /// The single active state row, if any.
    pub fn get_current_state(&self) -> Result<Option<SystemState>> {
        let conn = self.read()?;
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM system_states WHERE is_active = 1 ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => Ok(Some(read_state(&conn, id)?)),
            None => Ok(None),
        }
    }

    /// Roll the active state forward: deactivate existing rows, snapshot
    /// metrics, derive the summary, insert the new active row.
    pub fn update_current_state(&self, input: UpdateStateInput) -> Result<SystemState> {
        let tags_json = serde_json::to_string(&input.tags)?;
        let related_json = serde_json::to_string(&input.related_items)?;

        let id = self.with_tx(|tx| {
            let now = Utc::now();
            tx.execute(
                "UPDATE system_states SET is_active = 0, updated_at = ?1 WHERE is_active = 1",
                params![now.to_rfc3339()],
            )?;

            let metrics = compute_metrics(tx, now)?;
            let summary = derive_summary(&input.content);

            tx.execute(
                "INSERT INTO system_states (version, content, summary, metrics, tags,
                                            related_items, context, checkpoint, metadata,
                                            is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)",
                params![
                    env!("CARGO_PKG_VERSION"),
                    input.content,
                    summary,
                    serde_json::to_string(&metrics)?,
                    tags_json,
                    related_json,
                    input.context,
                    input.checkpoint,
                    input.metadata,
                    now.to_rfc3339(),
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        let conn = self.read()?;
        let state = read_state(&conn, id)?;
        drop(conn);
        self.mirror_state(&state);
        Ok(state)
    }

    /// All state rows, newest first. History is never deleted.
    pub fn state_history(&self, limit: u32) -> Result<Vec<SystemState>> {
        let conn = self.read()?;
        let mut stmt =
            conn.prepare("SELECT id FROM system_states ORDER BY id DESC LIMIT ?1")?;
        let ids = stmt
            .query_map(params![limit], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.into_iter().map(|id| read_state(&conn, id)).collect()
    }
}

/// First three lines of content joined with spaces, capped at 200 chars.
pub(crate) fn derive_summary(content: &str) -> String {
    let joined = content
        .lines()
        .take(SUMMARY_LINES)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    joined.chars().take(SUMMARY_CHARS).collect()
}

fn compute_metrics(conn: &Connection, timestamp: DateTime<Utc>) -> Result<StateMetrics> {
    let total_items: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
    let directed_rows: i64 =
        conn.query_row("SELECT COUNT(*) FROM item_relations", [], |row| row.get(0))?;
    let max_connections: i64 = conn.query_row(
        "SELECT COALESCE(MAX(n), 0) FROM
             (SELECT COUNT(*) AS n FROM item_relations GROUP BY source_id)",
        [],
        |row| row.get(0),
    )?;
    let isolated_nodes: i64 = conn.query_row(
        "SELECT COUNT(*) FROM items
         WHERE id NOT IN (SELECT source_id FROM item_relations)",
        [],
        |row| row.get(0),
    )?;

    let avg_connections = if total_items > 0 {
        directed_rows as f64 / total_items as f64
    } else {
        0.0
    };

    Ok(StateMetrics {
        total_items,
        total_relations: directed_rows / 2,
        avg_connections,
        max_connections,
        isolated_nodes,
        timestamp,
    })
}

fn read_state(conn: &Connection, id: i64) -> Result<SystemState> {
    let row = conn
        .query_row(
            "SELECT version, content, summary, metrics, tags, related_items,
                    context, checkpoint, metadata, is_active, created_at, updated_at
             FROM system_states WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, bool>(9)?,
                    row.get::<_, DateTime<Utc>>(10)?,
                    row.get::<_, DateTime<Utc>>(11)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| ServiceError::NotFound(format!("system state {id}")))?;

    let metrics: StateMetrics = serde_json::from_str(&row.3)
        .map_err(|e| ServiceError::Internal(format!("corrupt state metrics: {e}")))?;
    let tags: Vec<String> = serde_json::from_str(&row.4).unwrap_or_default();
    let related_items: Vec<i64> = serde_json::from_str(&row.5).unwrap_or_default();

    Ok(SystemState {
        id,
        version: row.0,
        content: row.1,
        summary: row.2,
        metrics,
        context: row.6,
        checkpoint: row.7,
        metadata: row.8,
        tags,
        related_items,
        is_active: row.9,
        created_at: row.10,
        updated_at: row.11,
    })
}
