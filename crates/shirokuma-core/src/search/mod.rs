//! Search and listing surface.
//!
//! `search_items` layers the structured query grammar over case-insensitive
//! substring matching; `list_items` is the plain filtered listing. Both
//! return lightweight projections without content or enrichment payloads.

mod query;

use rusqlite::types::ToSql;
use rusqlite::Connection;

use crate::error::Result;
use crate::items::{ItemSummary, ListItemsParams, Priority, SortBy, SortOrder};
use crate::storage::{self, Store};

use query::{parse_query, DateRange};

/// Hard ceiling on page size
const MAX_LIMIT: u32 = 100;
const DEFAULT_LIMIT: u32 = 20;

/// Parameters for `search_items`
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Restrict to these item types (ANDs with any `type:` tokens)
    pub types: Vec<String>,
    /// Clamped to 100; defaults to 20
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Store {
    /// Structured-query search. Unknown status names inside a `status:`
    /// filter contribute no matches without failing the request; an empty
    /// or unparseable query degrades to pure substring search.
    pub fn search_items(&self, raw_query: &str, params: &SearchParams) -> Result<Vec<ItemSummary>> {
        let parsed = parse_query(raw_query);
        let conn = self.read()?;
        let mut filters = Filters::new();

        filters.text_in_any(&parsed.text);
        filters.types_in(&params.types);
        filters.types_in(&parsed.types);
        filters.statuses_in(&conn, &parsed.statuses)?;
        filters.priorities_in(&parsed.priorities);
        filters.tags_any(&parsed.tags);
        filters.date_ranges(&parsed.date);
        filters.instant_ranges("i.created_at", &parsed.created);
        filters.instant_ranges("i.updated_at", &parsed.updated);

        fetch_summaries(
            &conn,
            &filters,
            "i.updated_at DESC, i.id ASC",
            params.limit,
            params.offset,
        )
    }

    /// Filtered listing with sorting. Filter semantics match
    /// `search_items`: OR within a key, AND across keys, unknown status or
    /// priority names degrade to no matches.
    pub fn list_items(&self, params: &ListItemsParams) -> Result<Vec<ItemSummary>> {
        let conn = self.read()?;
        let mut filters = Filters::new();

        if let Some(item_type) = &params.item_type {
            filters.types_in(std::slice::from_ref(item_type));
        }
        filters.statuses_in(&conn, &params.statuses)?;
        filters.priorities_in(&params.priorities);
        filters.tags_any(&params.tags);
        if params.include_closed_statuses == Some(false) {
            filters.push("s.is_closable = 0", Vec::new());
        }

        let direction = match params.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let order = match params.sort_by {
            SortBy::Created => format!("i.created_at {direction}, i.id ASC"),
            SortBy::Updated => format!("i.updated_at {direction}, i.id ASC"),
            SortBy::Priority => format!(
                "CASE i.priority WHEN 'CRITICAL' THEN 0 WHEN 'HIGH' THEN 1 \
                 WHEN 'MEDIUM' THEN 2 WHEN 'LOW' THEN 3 ELSE 4 END {direction}, i.id ASC"
            ),
        };

        fetch_summaries(&conn, &filters, &order, params.limit, params.offset)
    }
}

// ============================================================================
// FILTER BUILDER
// ============================================================================

/// Accumulates WHERE clauses and their positional parameters.
struct Filters {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Filters {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, clause: &str, params: Vec<Box<dyn ToSql>>) {
        self.clauses.push(clause.to_string());
        self.params.extend(params);
    }

    /// `column IN (...)` over string values. An empty value list is a no-op;
    /// the caller decides whether "nothing resolved" means match-nothing.
    fn string_in(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{column} IN ({placeholders})"));
        self.params
            .extend(values.iter().map(|v| Box::new(v.clone()) as Box<dyn ToSql>));
    }

    fn types_in(&mut self, types: &[String]) {
        self.string_in("i.type", types);
    }

    /// Resolve status names case-insensitively; unknown names simply do not
    /// resolve. A filter where nothing resolved matches nothing.
    fn statuses_in(&mut self, conn: &Connection, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut ids = Vec::new();
        for name in names {
            if let Some(id) = storage::lookup_status_id(conn, name)? {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        if ids.is_empty() {
            self.clauses.push("0 = 1".to_string());
            return Ok(());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.clauses
            .push(format!("i.status_id IN ({placeholders})"));
        self.params
            .extend(ids.into_iter().map(|id| Box::new(id) as Box<dyn ToSql>));
        Ok(())
    }

    /// Unknown priority names degrade the same way unknown statuses do.
    fn priorities_in(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let valid: Vec<String> = names
            .iter()
            .filter_map(|name| Priority::parse_name(name))
            .map(|p| p.as_str().to_string())
            .collect();
        if valid.is_empty() {
            self.clauses.push("0 = 1".to_string());
            return;
        }
        self.string_in("i.priority", &valid);
    }

    /// Item carries ANY of the named tags.
    fn tags_any(&mut self, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        let placeholders = vec!["?"; tags.len()].join(", ");
        self.clauses.push(format!(
            "EXISTS (SELECT 1 FROM item_tags it JOIN tags t ON t.id = it.tag_id \
             WHERE it.item_id = i.id AND t.name IN ({placeholders}))"
        ));
        self.params
            .extend(tags.iter().map(|t| Box::new(t.clone()) as Box<dyn ToSql>));
    }

    /// Each free-text token must appear in title, description, or content.
    fn text_in_any(&mut self, tokens: &[String]) {
        for token in tokens {
            let pattern = format!("%{}%", escape_like(token));
            self.clauses.push(
                "(i.title LIKE ? ESCAPE '\\' OR i.description LIKE ? ESCAPE '\\' \
                 OR i.content LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            for _ in 0..3 {
                self.params.push(Box::new(pattern.clone()));
            }
        }
    }

    /// Repeated ranges for one key OR together, like repeated `status:`
    /// values. Each range requires `[startDate, endDate]` to intersect it;
    /// items with neither date never match, a missing endpoint borrows the
    /// other.
    fn date_ranges(&mut self, ranges: &[DateRange]) {
        if ranges.is_empty() {
            return;
        }
        let group: Vec<String> = ranges.iter().map(|r| self.date_intersects(r)).collect();
        self.clauses.push(format!("({})", group.join(" OR ")));
    }

    fn date_intersects(&mut self, range: &DateRange) -> String {
        let mut parts = vec!["(i.start_date IS NOT NULL OR i.end_date IS NOT NULL)".to_string()];
        if let Some(from) = range.from {
            parts.push("COALESCE(i.end_date, i.start_date) >= ?".to_string());
            self.params.push(Box::new(from.to_rfc3339()));
        }
        if let Some(to) = range.to {
            parts.push("COALESCE(i.start_date, i.end_date) < ?".to_string());
            self.params.push(Box::new(to.to_rfc3339()));
        }
        format!("({})", parts.join(" AND "))
    }

    /// Repeated ranges OR together; within one range the instant column
    /// falls inside the half-open interval.
    fn instant_ranges(&mut self, column: &str, ranges: &[DateRange]) {
        if ranges.is_empty() {
            return;
        }
        let group: Vec<String> = ranges
            .iter()
            .map(|range| {
                let mut parts = Vec::new();
                if let Some(from) = range.from {
                    parts.push(format!("{column} >= ?"));
                    self.params.push(Box::new(from.to_rfc3339()));
                }
                if let Some(to) = range.to {
                    parts.push(format!("{column} < ?"));
                    self.params.push(Box::new(to.to_rfc3339()));
                }
                format!("({})", parts.join(" AND "))
            })
            .collect();
        self.clauses.push(format!("({})", group.join(" OR ")));
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn fetch_summaries(
    conn: &Connection,
    filters: &Filters,
    order: &str,
    limit: Option<u32>,
    offset: u32,
) -> Result<Vec<ItemSummary>> {
    let sql = format!(
        "SELECT i.id, i.type, i.title, i.description, i.priority, i.category, \
                i.created_at, i.updated_at, s.name \
         FROM items i JOIN statuses s ON s.id = i.status_id\
         {} ORDER BY {order} LIMIT {} OFFSET {}",
        filters.where_sql(),
        clamp_limit(limit),
        offset,
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = filters.params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, chrono::DateTime<chrono::Utc>>(6)?,
                row.get::<_, chrono::DateTime<chrono::Utc>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut summaries = Vec::with_capacity(rows.len());
    for (id, item_type, title, description, priority, category, created_at, updated_at, status) in
        rows
    {
        summaries.push(ItemSummary {
            id,
            item_type,
            title,
            description,
            priority: Priority::parse_name(&priority).unwrap_or_default(),
            status,
            category,
            tags: storage::item_tag_names(conn, id)?,
            created_at,
            updated_at,
        });
    }
    Ok(summaries)
}
