//! Relation tools: get_related_items, add_relations.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use shirokuma_core::{HybridWeights, RelatedParams, Store, Strategy, Thresholds};

use super::{parse_args, ToolResult};

pub fn related_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer", "description": "Query item id" },
            "depth": {
                "type": "integer",
                "minimum": 1,
                "maximum": 3,
                "default": 1,
                "description": "Graph-mode hop count over stored relations"
            },
            "types": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Restrict results to these item types"
            },
            "strategy": {
                "type": "string",
                "enum": ["keywords", "concepts", "embedding", "hybrid"],
                "description": "Supplying any of strategy/weights/thresholds switches to hybrid scoring"
            },
            "weights": {
                "type": "object",
                "properties": {
                    "keywords": { "type": "number" },
                    "concepts": { "type": "number" },
                    "embedding": { "type": "number" }
                },
                "description": "Hybrid component weights; renormalized, default 1/3 each"
            },
            "thresholds": {
                "type": "object",
                "properties": {
                    "min_keyword_weight": { "type": "number" },
                    "min_confidence": { "type": "number" },
                    "min_similarity": { "type": "number" }
                },
                "description": "A component score below its threshold contributes 0"
            },
            "limit": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 }
        },
        "required": ["id"]
    })
}

pub fn add_relations_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sourceId": { "type": "integer" },
            "targetIds": {
                "type": "array",
                "items": { "type": "integer" },
                "description": "Unknown ids are skipped silently; duplicates are idempotent"
            }
        },
        "required": ["sourceId", "targetIds"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RelatedArgs {
    id: i64,
    depth: Option<u32>,
    #[serde(default)]
    types: Vec<String>,
    strategy: Option<Strategy>,
    weights: Option<HybridWeights>,
    thresholds: Option<Thresholds>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AddRelationsArgs {
    source_id: i64,
    target_ids: Vec<i64>,
}

pub async fn execute_related(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: RelatedArgs = parse_args(args)?;
    let result = store.get_related_items(
        args.id,
        &RelatedParams {
            depth: args.depth,
            types: args.types,
            strategy: args.strategy,
            weights: args.weights,
            thresholds: args.thresholds,
            limit: args.limit,
        },
    )?;
    Ok(serde_json::to_value(result)?)
}

pub async fn execute_add_relations(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: AddRelationsArgs = parse_args(args)?;
    let result = store.add_relations(args.source_id, &args.target_ids)?;
    Ok(serde_json::to_value(result)?)
}
