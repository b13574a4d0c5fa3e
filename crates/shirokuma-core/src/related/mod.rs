//! Related-item engine.
//!
//! Two modes behind one call: plain BFS over the relation graph, and
//! hybrid scoring that fuses keyword overlap, concept overlap, and
//! embedding similarity into a single ranked result. Supplying any
//! strategy parameter (strategy, weights, thresholds) selects hybrid mode.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::enrich::{cosine_similarity, dequantize};
use crate::error::{Result, ServiceError};
use crate::items::{ItemSummary, Priority};
use crate::storage::{self, Store};

/// Default result size for hybrid mode
pub const DEFAULT_RELATED_LIMIT: u32 = 10;
const MAX_RELATED_LIMIT: u32 = 100;
const MAX_DEPTH: u32 = 3;

// ============================================================================
// PARAMETERS
// ============================================================================

/// Scoring strategy for hybrid mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Keywords,
    Concepts,
    Embedding,
    #[default]
    Hybrid,
}

/// Component weights for the `hybrid` strategy. Renormalized before use;
/// each defaults to 1/3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub keywords: f64,
    pub concepts: f64,
    pub embedding: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            keywords: 1.0 / 3.0,
            concepts: 1.0 / 3.0,
            embedding: 1.0 / 3.0,
        }
    }
}

impl HybridWeights {
    fn normalized(self) -> Self {
        let sum = self.keywords + self.concepts + self.embedding;
        if sum <= 0.0 || !sum.is_finite() {
            return Self::default();
        }
        Self {
            keywords: self.keywords / sum,
            concepts: self.concepts / sum,
            embedding: self.embedding / sum,
        }
    }
}

/// Per-component gates: a component score below its threshold contributes 0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_keyword_weight: Option<f64>,
    pub min_confidence: Option<f64>,
    pub min_similarity: Option<f64>,
}

/// Parameters for `get_related_items`
#[derive(Debug, Clone, Default)]
pub struct RelatedParams {
    /// Graph-mode hop count, clamped to `[1, 3]`; defaults to 1
    pub depth: Option<u32>,
    /// Restrict results to these item types
    pub types: Vec<String>,
    pub strategy: Option<Strategy>,
    pub weights: Option<HybridWeights>,
    pub thresholds: Option<Thresholds>,
    /// Hybrid-mode result size, defaults to 10
    pub limit: Option<u32>,
}

impl RelatedParams {
    fn hybrid_requested(&self) -> bool {
        self.strategy.is_some() || self.weights.is_some() || self.thresholds.is_some()
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// A traversed (or scored) edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEdge {
    pub source: i64,
    pub target: i64,
}

/// A related item with its hybrid score, when scored
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedItem {
    #[serde(flatten)]
    pub item: ItemSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_reason: Option<String>,
}

/// Result of `get_related_items`
#[derive(Debug, Clone, Serialize)]
pub struct RelatedResult {
    pub items: Vec<RelatedItem>,
    pub edges: Vec<RelatedEdge>,
}

impl Store {
    /// Neighborhood of an item: BFS when no strategy parameter is supplied,
    /// hybrid scoring otherwise. A query item without an embedding degrades
    /// the embedding component to 0 instead of failing.
    pub fn get_related_items(&self, id: i64, params: &RelatedParams) -> Result<RelatedResult> {
        let conn = self.read()?;
        if !storage::item_exists(&conn, id)? {
            return Err(ServiceError::NotFound(format!("item {id}")));
        }
        if params.hybrid_requested() {
            hybrid_mode(&conn, id, params)
        } else {
            graph_mode(&conn, id, params)
        }
    }
}

// ============================================================================
// GRAPH MODE
// ============================================================================

fn graph_mode(conn: &Connection, root: i64, params: &RelatedParams) -> Result<RelatedResult> {
    let depth = params.depth.unwrap_or(1).clamp(1, MAX_DEPTH);
    let mut type_cache: HashMap<i64, bool> = HashMap::new();

    let mut visited: HashSet<i64> = HashSet::from([root]);
    let mut frontier = vec![root];
    let mut reached: Vec<i64> = Vec::new();
    let mut edges: Vec<RelatedEdge> = Vec::new();
    let mut seen_pairs: HashSet<(i64, i64)> = HashSet::new();

    for _ in 0..depth {
        let mut next = Vec::new();
        for &node in &frontier {
            for neighbor in storage::related_ids(conn, node)? {
                if !type_allowed(conn, neighbor, &params.types, &mut type_cache)? {
                    continue;
                }
                let pair = (node.min(neighbor), node.max(neighbor));
                if seen_pairs.insert(pair) {
                    edges.push(RelatedEdge {
                        source: node,
                        target: neighbor,
                    });
                }
                if visited.insert(neighbor) {
                    reached.push(neighbor);
                    next.push(neighbor);
                }
            }
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }

    let mut items = Vec::with_capacity(reached.len());
    for id in reached {
        items.push(RelatedItem {
            item: summary(conn, id)?,
            search_score: None,
            search_reason: None,
        });
    }
    Ok(RelatedResult { items, edges })
}

fn type_allowed(
    conn: &Connection,
    id: i64,
    types: &[String],
    cache: &mut HashMap<i64, bool>,
) -> Result<bool> {
    if types.is_empty() {
        return Ok(true);
    }
    if let Some(&allowed) = cache.get(&id) {
        return Ok(allowed);
    }
    let item_type: Option<String> = conn
        .query_row("SELECT type FROM items WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    let allowed = item_type.map(|t| types.contains(&t)).unwrap_or(false);
    cache.insert(id, allowed);
    Ok(allowed)
}

// ============================================================================
// HYBRID MODE
// ============================================================================

struct Scored {
    id: i64,
    score: f64,
    keyword: f64,
    concept: f64,
    similarity: f64,
}

fn hybrid_mode(conn: &Connection, root: i64, params: &RelatedParams) -> Result<RelatedResult> {
    let strategy = params.strategy.unwrap_or_default();
    let weights = params.weights.unwrap_or_default().normalized();
    let thresholds = params.thresholds.unwrap_or_default();
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RELATED_LIMIT)
        .clamp(1, MAX_RELATED_LIMIT) as usize;

    let keyword_scores = shared_weight_scores(
        conn,
        root,
        "item_keywords",
        "keyword_id",
        "weight",
    )?;
    let concept_scores = shared_weight_scores(
        conn,
        root,
        "item_concepts",
        "concept_id",
        "confidence",
    )?;
    let query_embedding = storage::item_embedding(conn, root)?.map(|bytes| dequantize(&bytes));

    let candidates = candidate_rows(conn, root, &params.types)?;

    let mut scored: Vec<Scored> = Vec::new();
    for (id, embedding) in candidates {
        let mut keyword = keyword_scores.get(&id).copied().unwrap_or(0.0);
        if let Some(min) = thresholds.min_keyword_weight {
            if keyword < min {
                keyword = 0.0;
            }
        }
        let mut concept = concept_scores.get(&id).copied().unwrap_or(0.0);
        if let Some(min) = thresholds.min_confidence {
            if concept < min {
                concept = 0.0;
            }
        }
        let mut similarity = match (&query_embedding, embedding) {
            (Some(query), Some(candidate)) => {
                f64::from(cosine_similarity(query, &dequantize(&candidate))).max(0.0)
            }
            _ => 0.0,
        };
        if let Some(min) = thresholds.min_similarity {
            if similarity < min {
                similarity = 0.0;
            }
        }

        let score = match strategy {
            Strategy::Keywords => keyword,
            Strategy::Concepts => concept,
            Strategy::Embedding => similarity,
            Strategy::Hybrid => {
                weights.keywords * keyword
                    + weights.concepts * concept
                    + weights.embedding * similarity
            }
        };
        if score > 0.0 {
            scored.push(Scored {
                id,
                score,
                keyword,
                concept,
                similarity,
            });
        }
    }

    // Descending score; ties broken by higher embedding score, then lower id
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.truncate(limit);

    let mut items = Vec::with_capacity(scored.len());
    let mut edges = Vec::with_capacity(scored.len());
    for entry in &scored {
        items.push(RelatedItem {
            item: summary(conn, entry.id)?,
            search_score: Some(entry.score),
            search_reason: Some(reason_for(strategy, &weights, entry)),
        });
        edges.push(RelatedEdge {
            source: root,
            target: entry.id,
        });
    }
    Ok(RelatedResult { items, edges })
}

/// Sum of `min(w_query, w_candidate)` over shared join rows, normalized by
/// the query item's total weight. Works for both keyword and concept joins.
fn shared_weight_scores(
    conn: &Connection,
    root: i64,
    table: &str,
    key_column: &str,
    weight_column: &str,
) -> Result<HashMap<i64, f64>> {
    let total: f64 = conn.query_row(
        &format!("SELECT COALESCE(SUM({weight_column}), 0) FROM {table} WHERE item_id = ?1"),
        params![root],
        |row| row.get(0),
    )?;
    if total <= 0.0 {
        return Ok(HashMap::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT b.item_id, SUM(MIN(a.{weight_column}, b.{weight_column}))
         FROM {table} a JOIN {table} b ON a.{key_column} = b.{key_column}
         WHERE a.item_id = ?1 AND b.item_id <> ?1
         GROUP BY b.item_id"
    ))?;
    let rows = stmt
        .query_map(params![root], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows
        .into_iter()
        .map(|(id, overlap)| (id, overlap / total))
        .collect())
}

fn candidate_rows(
    conn: &Connection,
    root: i64,
    types: &[String],
) -> Result<Vec<(i64, Option<Vec<u8>>)>> {
    let mut sql = "SELECT id, embedding FROM items WHERE id <> ?1".to_string();
    if !types.is_empty() {
        let placeholders = vec!["?"; types.len()].join(", ");
        sql.push_str(&format!(" AND type IN ({placeholders})"));
    }
    let mut stmt = conn.prepare(&sql)?;

    let mut binds: Vec<&dyn rusqlite::types::ToSql> = vec![&root];
    for t in types {
        binds.push(t);
    }
    let rows = stmt
        .query_map(binds.as_slice(), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<Vec<u8>>>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Human-readable reason naming the dominant component(s).
fn reason_for(strategy: Strategy, weights: &HybridWeights, entry: &Scored) -> String {
    let label = |name: &str, value: f64| format!("{name} ({value:.2})");
    match strategy {
        Strategy::Keywords => label("keyword overlap", entry.keyword),
        Strategy::Concepts => label("concept overlap", entry.concept),
        Strategy::Embedding => label("embedding similarity", entry.similarity),
        Strategy::Hybrid => {
            let contributions = [
                ("keyword overlap", weights.keywords * entry.keyword),
                ("concept overlap", weights.concepts * entry.concept),
                ("embedding similarity", weights.embedding * entry.similarity),
            ];
            let max = contributions
                .iter()
                .map(|(_, c)| *c)
                .fold(0.0f64, f64::max);
            let dominant: Vec<&str> = contributions
                .iter()
                .filter(|(_, c)| *c > 0.0 && *c >= 0.75 * max)
                .map(|(name, _)| *name)
                .collect();
            dominant.join(" + ")
        }
    }
}

fn summary(conn: &Connection, id: i64) -> Result<ItemSummary> {
    let row = conn
        .query_row(
            "SELECT i.type, i.title, i.description, i.priority, i.category,
                    i.created_at, i.updated_at, s.name
             FROM items i JOIN statuses s ON s.id = i.status_id
             WHERE i.id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, chrono::DateTime<chrono::Utc>>(5)?,
                    row.get::<_, chrono::DateTime<chrono::Utc>>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| ServiceError::NotFound(format!("item {id}")))?;

    Ok(ItemSummary {
        id,
        item_type: row.0,
        title: row.1,
        description: row.2,
        priority: Priority::parse_name(&row.3).unwrap_or_default(),
        status: row.7,
        category: row.4,
        tags: storage::item_tag_names(conn, id)?,
        created_at: row.5,
        updated_at: row.6,
    })
}
