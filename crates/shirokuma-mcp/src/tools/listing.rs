//! Listing tools: list_items, search_items.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use shirokuma_core::{ListItemsParams, SearchParams, SortBy, SortOrder, Store};

use super::{parse_args, ToolResult};

pub fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Free text plus structured tokens: 'key:value' for type/status/priority/tag, \
                                'key:from..to' ranges for date/created/updated, quoted values allowed. \
                                Example: 'status:Open type:issue tag:backend date:2025-01-01.. parser crash'"
            },
            "types": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Restrict to these item types"
            },
            "limit": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 },
            "offset": { "type": "integer", "minimum": 0, "default": 0 }
        },
        "required": ["query"]
    })
}

pub fn list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string", "description": "Filter by item type" },
            "status": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Status names (case-insensitive; unknown names match nothing)"
            },
            "priority": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Priority names; OR together"
            },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Items carrying ANY of these tags"
            },
            "includeClosedStatuses": {
                "type": "boolean",
                "description": "Set false to exclude items in closable statuses",
                "default": true
            },
            "limit": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 },
            "offset": { "type": "integer", "minimum": 0, "default": 0 },
            "sortBy": { "type": "string", "enum": ["created", "updated", "priority"], "default": "created" },
            "sortOrder": { "type": "string", "enum": ["asc", "desc"], "default": "desc" }
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    types: Vec<String>,
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ListArgs {
    #[serde(rename = "type")]
    item_type: Option<String>,
    #[serde(default)]
    status: Vec<String>,
    #[serde(default)]
    priority: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    include_closed_statuses: Option<bool>,
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    sort_by: SortBy,
    #[serde(default)]
    sort_order: SortOrder,
}

pub async fn execute_search(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: SearchArgs = parse_args(args)?;
    let items = store.search_items(
        &args.query,
        &SearchParams {
            types: args.types,
            limit: args.limit,
            offset: args.offset,
        },
    )?;
    Ok(json!({ "count": items.len(), "items": items }))
}

pub async fn execute_list(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: ListArgs = parse_args(args)?;
    let items = store.list_items(&ListItemsParams {
        item_type: args.item_type,
        statuses: args.status,
        priorities: args.priority,
        tags: args.tags,
        include_closed_statuses: args.include_closed_statuses,
        limit: args.limit,
        offset: args.offset,
        sort_by: args.sort_by,
        sort_order: args.sort_order,
    })?;
    Ok(json!({ "count": items.len(), "items": items }))
}
