//! Statistics tools: get_stats, get_tags.

use std::sync::Arc;

use serde_json::{json, Value};

use shirokuma_core::Store;

use super::ToolResult;

pub fn stats_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

pub fn tags_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

pub async fn execute_stats(store: &Arc<Store>, _args: Option<Value>) -> ToolResult {
    let stats = store.get_stats()?;
    Ok(serde_json::to_value(stats)?)
}

pub async fn execute_tags(store: &Arc<Store>, _args: Option<Value>) -> ToolResult {
    let tags = store.get_tags()?;
    Ok(json!({ "count": tags.len(), "tags": tags }))
}
