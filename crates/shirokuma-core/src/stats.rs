//! Aggregate statistics.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Store;

/// Number of tags reported in the stats top list
const TOP_TAGS: usize = 10;

/// A grouped count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCount {
    pub key: String,
    pub count: i64,
}

/// A tag with its use count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// Store-wide statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_items: i64,
    /// Undirected relation count
    pub total_relations: i64,
    pub by_type: Vec<KeyCount>,
    pub by_status: Vec<KeyCount>,
    pub by_priority: Vec<KeyCount>,
    pub top_tags: Vec<TagCount>,
}

impl Store {
    /// Counts grouped by type, status, and priority, plus the ten most
    /// used tags.
    pub fn get_stats(&self) -> Result<Stats> {
        let conn = self.read()?;
        let total_items: i64 =
            conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        let directed_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM item_relations", [], |row| row.get(0))?;

        let by_type = grouped(
            &conn,
            "SELECT type, COUNT(*) FROM items GROUP BY type ORDER BY COUNT(*) DESC, type",
        )?;
        let by_status = grouped(
            &conn,
            "SELECT s.name, COUNT(*) FROM items i JOIN statuses s ON s.id = i.status_id
             GROUP BY s.name ORDER BY COUNT(*) DESC, s.name",
        )?;
        let by_priority = grouped(
            &conn,
            "SELECT priority, COUNT(*) FROM items GROUP BY priority ORDER BY COUNT(*) DESC, priority",
        )?;

        let mut top_tags = tag_counts(&conn)?;
        top_tags.retain(|t| t.count > 0);
        top_tags.truncate(TOP_TAGS);

        Ok(Stats {
            total_items,
            total_relations: directed_rows / 2,
            by_type,
            by_status,
            by_priority,
            top_tags,
        })
    }

    /// All tags with use counts, most used first.
    pub fn get_tags(&self) -> Result<Vec<TagCount>> {
        let conn = self.read()?;
        tag_counts(&conn)
    }
}

fn grouped(conn: &Connection, sql: &str) -> Result<Vec<KeyCount>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(KeyCount {
                key: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn tag_counts(conn: &Connection) -> Result<Vec<TagCount>> {
    let mut stmt = conn.prepare(
        "SELECT t.name, COUNT(it.item_id) FROM tags t
         LEFT JOIN item_tags it ON it.tag_id = t.id
         GROUP BY t.name ORDER BY COUNT(it.item_id) DESC, t.name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TagCount {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
