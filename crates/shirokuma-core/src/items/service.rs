//! Item write operations.
//!
//! The only code path that mutates items. Every operation is one database
//! transaction; enrichment runs before the transaction opens so provider
//! latency stays out of the write's hot section, and mirror writes happen
//! after commit.

use chrono::Utc;
use rusqlite::{params, Transaction};
use serde::Serialize;

use crate::enrich::EnrichmentParts;
use crate::error::{Result, ServiceError};
use crate::storage::{self, Store};
use crate::version::normalize_version;

use super::{
    validate_title, validate_type, CreateItemInput, Item, UpdateItemInput, DEFAULT_STATUS,
};

/// Outcome of `add_relations`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRelationsResult {
    /// Targets that exist and are now symmetrically linked
    pub linked: Vec<i64>,
    /// Targets skipped because they do not exist (or were the source)
    pub skipped: Vec<i64>,
}

impl Store {
    /// Create an item: resolve status, ensure tags, enrich, insert the row
    /// and its joins, and link any existing related ids - all in one
    /// transaction. Missing related ids are skipped silently.
    pub fn create_item(&self, input: CreateItemInput) -> Result<Item> {
        validate_type(&input.item_type)?;
        validate_title(&input.title)?;
        let version = input.version.as_deref().map(normalize_version).transpose()?;
        let status_name = input
            .status
            .clone()
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());
        let priority = input.priority.unwrap_or_default();

        let enrichment = self.enricher().generate(&EnrichmentParts {
            title: &input.title,
            description: &input.description,
            content: &input.content,
        });

        let now = Utc::now();
        let id = self.with_tx(|tx| {
            let status_id = storage::status_id(tx, &status_name)?;
            tx.execute(
                "INSERT INTO items (type, title, description, content, priority, status_id,
                                    category, start_date, end_date, version,
                                    ai_summary, search_index, embedding,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                params![
                    input.item_type,
                    input.title,
                    input.description,
                    input.content,
                    priority.as_str(),
                    status_id,
                    input.category,
                    input.start_date.map(|d| d.to_rfc3339()),
                    input.end_date.map(|d| d.to_rfc3339()),
                    version,
                    enrichment.summary,
                    enrichment.search_index,
                    enrichment.embedding,
                    now.to_rfc3339(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            apply_tags(tx, id, &input.tags)?;
            storage::insert_enrichment_joins(tx, id, &enrichment)?;
            for &target in &input.related {
                if target != id && storage::item_exists(tx, target)? {
                    storage::insert_relation_pair(tx, id, target)?;
                }
            }
            Ok(id)
        })?;

        let item = self.get_item(id)?;
        self.mirror_item(&item, None);
        Ok(item)
    }

    /// Update an item. Missing fields are left unchanged; supplied `tags`
    /// and `related` replace the stored sets.
    ///
    /// Enrichment is recomputed iff the update includes any of `title`,
    /// `description`, or `content`; the keyword and concept joins are then
    /// replaced atomically. Field-only updates never touch the enrichment
    /// columns.
    pub fn update_item(&self, input: UpdateItemInput) -> Result<Item> {
        let existing = self.get_item(input.id)?;

        if let Some(item_type) = &input.item_type {
            validate_type(item_type)?;
        }
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        let version = match &input.version {
            Some(v) => Some(normalize_version(v)?),
            // Re-normalizing the denormalized read restores the stored form
            None => existing.version.as_deref().map(normalize_version).transpose()?,
        };

        let enrichment = if input.triggers_enrichment() {
            Some(self.enricher().generate(&EnrichmentParts {
                title: input.title.as_deref().unwrap_or(&existing.title),
                description: input
                    .description
                    .as_deref()
                    .unwrap_or(&existing.description),
                content: input.content.as_deref().unwrap_or(&existing.content),
            }))
        } else {
            None
        };

        let now = Utc::now();
        self.with_tx(|tx| {
            let status_id = match &input.status {
                Some(name) => storage::status_id(tx, name)?,
                None => existing.status.id,
            };
            let start_date = input.start_date.or(existing.start_date);
            let end_date = input.end_date.or(existing.end_date);

            tx.execute(
                "UPDATE items SET type = ?1, title = ?2, description = ?3, content = ?4,
                                  priority = ?5, status_id = ?6, category = ?7,
                                  start_date = ?8, end_date = ?9, version = ?10,
                                  updated_at = ?11
                 WHERE id = ?12",
                params![
                    input.item_type.as_deref().unwrap_or(&existing.item_type),
                    input.title.as_deref().unwrap_or(&existing.title),
                    input.description.as_deref().unwrap_or(&existing.description),
                    input.content.as_deref().unwrap_or(&existing.content),
                    input.priority.unwrap_or(existing.priority).as_str(),
                    status_id,
                    input.category.as_deref().or(existing.category.as_deref()),
                    start_date.map(|d| d.to_rfc3339()),
                    end_date.map(|d| d.to_rfc3339()),
                    version,
                    now.to_rfc3339(),
                    input.id,
                ],
            )?;

            if let Some(tags) = &input.tags {
                tx.execute("DELETE FROM item_tags WHERE item_id = ?1", params![input.id])?;
                apply_tags(tx, input.id, tags)?;
            }

            if let Some(enrichment) = &enrichment {
                storage::clear_enrichment_joins(tx, input.id)?;
                storage::insert_enrichment_joins(tx, input.id, enrichment)?;
                tx.execute(
                    "UPDATE items SET ai_summary = ?1, search_index = ?2, embedding = ?3
                     WHERE id = ?4",
                    params![
                        enrichment.summary,
                        enrichment.search_index,
                        enrichment.embedding,
                        input.id
                    ],
                )?;
            }

            if let Some(related) = &input.related {
                let current = storage::related_ids(tx, input.id)?;
                let mut desired: Vec<i64> = Vec::new();
                for &target in related {
                    if target != input.id
                        && storage::item_exists(tx, target)?
                        && !desired.contains(&target)
                    {
                        desired.push(target);
                    }
                }
                for &gone in current.iter().filter(|id| !desired.contains(id)) {
                    storage::delete_relation_pair(tx, input.id, gone)?;
                }
                for &added in desired.iter().filter(|id| !current.contains(id)) {
                    storage::insert_relation_pair(tx, input.id, added)?;
                }
            }

            Ok(())
        })?;

        let item = self.get_item(input.id)?;
        self.mirror_item(&item, Some(&existing.title));
        Ok(item)
    }

    /// Ensure symmetric relation rows from `source_id` to each existing
    /// target. Idempotent; unknown targets are skipped silently.
    pub fn add_relations(&self, source_id: i64, target_ids: &[i64]) -> Result<AddRelationsResult> {
        self.with_tx(|tx| {
            if !storage::item_exists(tx, source_id)? {
                return Err(ServiceError::NotFound(format!("item {source_id}")));
            }
            let mut linked = Vec::new();
            let mut skipped = Vec::new();
            for &target in target_ids {
                if target != source_id && storage::item_exists(tx, target)? {
                    storage::insert_relation_pair(tx, source_id, target)?;
                    if !linked.contains(&target) {
                        linked.push(target);
                    }
                } else {
                    skipped.push(target);
                }
            }
            Ok(AddRelationsResult { linked, skipped })
        })
    }
}

fn apply_tags(tx: &Transaction, item_id: i64, names: &[String]) -> Result<()> {
    for tag_id in storage::ensure_tags(tx, names)? {
        tx.execute(
            "INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?1, ?2)",
            params![item_id, tag_id],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::items::Priority;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&Config::at(dir.path().join("kb.db"))).unwrap();
        (dir, store)
    }

    fn issue(title: &str, content: &str, tags: &[&str]) -> CreateItemInput {
        CreateItemInput {
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..CreateItemInput::new("issue", title)
        }
    }

    fn search_index_of(store: &Store, id: i64) -> Option<String> {
        let conn = store.read().unwrap();
        conn.query_row(
            "SELECT search_index FROM items WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_create_defaults_and_hydration() {
        let (_dir, store) = open_store();
        let item = store
            .create_item(issue(
                "Search test: JavaScript error",
                "Getting TypeError when calling undefined function",
                &["javascript", "error", "bug"],
            ))
            .unwrap();

        assert!(item.id >= 1);
        assert_eq!(item.status.name, "Open");
        assert_eq!(item.priority, Priority::Medium);
        assert_eq!(item.tags, vec!["bug", "error", "javascript"]);
        assert!(!item.keywords.is_empty());
        assert!(item.keywords.iter().all(|k| k.weight > 0.0 && k.weight <= 1.0));
        assert!(item.ai_summary.is_some());

        let fetched = store.get_item(item.id).unwrap();
        assert_eq!(fetched.title, item.title);
    }

    #[test]
    fn test_create_validation_errors() {
        let (_dir, store) = open_store();
        let bad_type = CreateItemInput::new("Not-Valid", "t");
        assert!(matches!(
            store.create_item(bad_type),
            Err(ServiceError::InvalidInput(_))
        ));

        let bad_title = CreateItemInput::new("issue", "x".repeat(201));
        assert!(matches!(
            store.create_item(bad_title),
            Err(ServiceError::InvalidInput(_))
        ));

        let bad_status = CreateItemInput {
            status: Some("NoSuchStatus".to_string()),
            ..CreateItemInput::new("issue", "t")
        };
        assert!(matches!(
            store.create_item(bad_status),
            Err(ServiceError::NotFound(_))
        ));

        let bad_version = CreateItemInput {
            version: Some("1.2".to_string()),
            ..CreateItemInput::new("issue", "t")
        };
        assert!(matches!(
            store.create_item(bad_version),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_version_stored_normalized_and_read_denormalized() {
        let (_dir, store) = open_store();
        let item = store
            .create_item(CreateItemInput {
                version: Some("1.20.3".to_string()),
                ..CreateItemInput::new("release", "v1.20.3")
            })
            .unwrap();
        assert_eq!(item.version.as_deref(), Some("1.20.3"));

        let conn = store.read().unwrap();
        let stored: String = conn
            .query_row(
                "SELECT version FROM items WHERE id = ?1",
                params![item.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, "00001.00020.00003");
    }

    #[test]
    fn test_create_links_existing_related_and_skips_missing() {
        let (_dir, store) = open_store();
        let a = store.create_item(issue("a", "", &[])).unwrap();
        let b = store
            .create_item(CreateItemInput {
                related: vec![a.id, 999],
                ..CreateItemInput::new("issue", "b")
            })
            .unwrap();
        assert_eq!(b.related, vec![a.id]);
        assert_eq!(store.get_item(a.id).unwrap().related, vec![b.id]);
    }

    #[test]
    fn test_content_update_replaces_enrichment() {
        let (_dir, store) = open_store();
        let item = store
            .create_item(issue("JS failure", "Getting a TypeError in production", &[]))
            .unwrap();
        let before: Vec<String> = item.keywords.iter().map(|k| k.word.clone()).collect();

        let updated = store
            .update_item(UpdateItemInput {
                content: Some("Updated: now also about typescript and compilers".to_string()),
                ..UpdateItemInput::for_id(item.id)
            })
            .unwrap();
        let after: Vec<String> = updated.keywords.iter().map(|k| k.word.clone()).collect();

        assert_ne!(before, after);
        assert!(after.iter().any(|w| w == "typescript"));
        // No stale joins: stored keyword rows match the hydrated set exactly
        let conn = store.read().unwrap();
        let join_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM item_keywords WHERE item_id = ?1",
                params![item.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(join_count as usize, after.len());
    }

    #[test]
    fn test_field_only_update_preserves_enrichment() {
        let (_dir, store) = open_store();
        let item = store
            .create_item(issue(
                "JS failure",
                "Getting a TypeError in production",
                &["javascript", "error", "bug"],
            ))
            .unwrap();

        let embedding_before = {
            let conn = store.read().unwrap();
            storage::item_embedding(&conn, item.id).unwrap()
        };
        let index_before = search_index_of(&store, item.id);

        let updated = store
            .update_item(UpdateItemInput {
                priority: Some(Priority::High),
                tags: Some(vec!["javascript".to_string(), "error".to_string()]),
                ..UpdateItemInput::for_id(item.id)
            })
            .unwrap();

        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.tags, vec!["error", "javascript"]);
        assert_eq!(updated.ai_summary, item.ai_summary);
        assert_eq!(
            updated.keywords, item.keywords,
            "keyword set must survive a field-only update"
        );

        let embedding_after = {
            let conn = store.read().unwrap();
            storage::item_embedding(&conn, item.id).unwrap()
        };
        assert_eq!(embedding_before, embedding_after);
        assert_eq!(index_before, search_index_of(&store, item.id));
    }

    #[test]
    fn test_update_replaces_related_set() {
        let (_dir, store) = open_store();
        let a = store.create_item(issue("a", "", &[])).unwrap();
        let b = store.create_item(issue("b", "", &[])).unwrap();
        let c = store.create_item(issue("c", "", &[])).unwrap();

        store
            .update_item(UpdateItemInput {
                related: Some(vec![b.id, c.id]),
                ..UpdateItemInput::for_id(a.id)
            })
            .unwrap();
        assert_eq!(store.get_item(a.id).unwrap().related, vec![b.id, c.id]);

        store
            .update_item(UpdateItemInput {
                related: Some(vec![c.id]),
                ..UpdateItemInput::for_id(a.id)
            })
            .unwrap();
        assert_eq!(store.get_item(a.id).unwrap().related, vec![c.id]);
        // The dropped pair is gone from both directions
        assert!(store.get_item(b.id).unwrap().related.is_empty());
    }

    #[test]
    fn test_update_missing_item_is_not_found() {
        let (_dir, store) = open_store();
        assert!(matches!(
            store.update_item(UpdateItemInput::for_id(42)),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_relations_idempotent_and_symmetric() {
        let (_dir, store) = open_store();
        let a = store.create_item(issue("a", "", &[])).unwrap();
        let b = store.create_item(issue("b", "", &[])).unwrap();

        let first = store.add_relations(a.id, &[b.id, 77]).unwrap();
        assert_eq!(first.linked, vec![b.id]);
        assert_eq!(first.skipped, vec![77]);

        let second = store.add_relations(a.id, &[b.id]).unwrap();
        assert_eq!(second.linked, vec![b.id]);

        let conn = store.read().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM item_relations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2, "exactly one directed row per direction");
    }

    #[test]
    fn test_delete_cascades_joins_and_relations() {
        let (_dir, store) = open_store();
        let a = store
            .create_item(issue("a", "content words here", &["x"]))
            .unwrap();
        let b = store.create_item(issue("b", "", &[])).unwrap();
        store.add_relations(a.id, &[b.id]).unwrap();

        store.delete_item(a.id).unwrap();
        assert!(matches!(store.get_item(a.id), Err(ServiceError::NotFound(_))));

        let conn = store.read().unwrap();
        for table in ["item_tags", "item_keywords", "item_concepts"] {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE item_id = ?1"),
                    params![a.id],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 0, "{table} rows must cascade");
        }
        let relations: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM item_relations WHERE source_id = ?1 OR target_id = ?1",
                params![a.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(relations, 0);
    }
}
