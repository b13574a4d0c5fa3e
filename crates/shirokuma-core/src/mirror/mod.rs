//! Markdown file mirror.
//!
//! When an export directory is configured, every successful item or state
//! write is materialized as a Markdown file with a YAML frontmatter block
//! so the database and a human-readable tree stay in sync. Mirror writes
//! run after the database commit and never participate in the transaction;
//! failures are logged by the caller and the primary write still succeeds.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, ServiceError};
use crate::items::Item;
use crate::state::{StateMetrics, SystemState};

const STATE_SUBDIR: &str = ".system/current_state";
const MAX_TITLE_CHARS: usize = 100;

/// Writer for the export tree.
pub struct Mirror {
    root: PathBuf,
}

impl Mirror {
    /// Open (creating if needed) the export root. Fails when the path
    /// exists but is not a directory.
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        if !std::fs::metadata(&root)?.is_dir() {
            return Err(ServiceError::Internal(format!(
                "export path {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Materialize an item as `<root>/<type>/<id>-<sanitized_title>.md`.
    /// When the title changed, the file under the old name is removed.
    pub fn write_item(&self, item: &Item, old_title: Option<&str>) -> Result<()> {
        let path = self.item_path(&item.item_type, item.id, &item.title)?;

        if let Some(old) = old_title {
            if old != item.title {
                let old_path = self.item_path(&item.item_type, item.id, old)?;
                if old_path != path {
                    remove_if_exists(&old_path)?;
                }
            }
        }

        let frontmatter = ItemFrontmatter {
            id: item.id,
            item_type: &item.item_type,
            title: &item.title,
            description: &item.description,
            status: &item.status.name,
            priority: item.priority.as_str(),
            tags: &item.tags,
            created_at: item.created_at,
            updated_at: item.updated_at,
        };
        write_markdown(&path, &frontmatter, &item.content)
    }

    /// Remove the mirror file for a deleted item. Missing files are fine.
    pub fn remove_item(&self, item_type: &str, id: i64, title: &str) -> Result<()> {
        let path = self.item_path(item_type, id, title)?;
        remove_if_exists(&path)
    }

    /// Materialize the active state row under `.system/current_state/`.
    pub fn write_state(&self, state: &SystemState) -> Result<()> {
        let path = self.root.join(STATE_SUBDIR).join(format!("{}.md", state.id));
        self.ensure_confined(&path)?;

        let frontmatter = StateFrontmatter {
            id: state.id,
            version: &state.version,
            metrics: &state.metrics,
            tags: &state.tags,
            related_items: &state.related_items,
            created_at: state.created_at,
            updated_at: state.updated_at,
        };
        write_markdown(&path, &frontmatter, &state.content)
    }

    fn item_path(&self, item_type: &str, id: i64, title: &str) -> Result<PathBuf> {
        // Types are validated on write, but the mirror re-checks before
        // using one as a path component.
        crate::items::validate_type(item_type)?;
        let file = format!("{id}-{}.md", sanitize_title(title));
        let path = self.root.join(item_type).join(file);
        self.ensure_confined(&path)?;
        Ok(path)
    }

    /// Path components must stay inside the export root.
    fn ensure_confined(&self, path: &Path) -> Result<()> {
        if path.components().any(|c| matches!(c, Component::ParentDir)) || !path.starts_with(&self.root)
        {
            tracing::warn!("rejecting mirror path outside export root: {}", path.display());
            return Err(ServiceError::InvalidInput(format!(
                "mirror path escapes export root: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

/// Replace filesystem-unsafe characters with `_` and bound the length.
fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .take(MAX_TITLE_CHARS)
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "untitled".to_string()
    } else {
        sanitized
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn write_markdown<T: Serialize>(path: &Path, frontmatter: &T, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(frontmatter)
        .map_err(|e| ServiceError::Internal(format!("frontmatter serialization: {e}")))?;
    let document = format!("---\n{yaml}---\n\n{body}\n");
    std::fs::write(path, document)?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemFrontmatter<'a> {
    id: i64,
    #[serde(rename = "type")]
    item_type: &'a str,
    title: &'a str,
    description: &'a str,
    status: &'a str,
    priority: &'a str,
    tags: &'a [String],
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateFrontmatter<'a> {
    id: i64,
    version: &'a str,
    metrics: &'a StateMetrics,
    tags: &'a [String],
    related_items: &'a [i64],
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
