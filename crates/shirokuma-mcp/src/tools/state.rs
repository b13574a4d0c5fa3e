//! System-state tools: get_current_state, update_current_state.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use shirokuma_core::{Store, UpdateStateInput};

use super::{parse_args, ToolResult};

pub fn get_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

pub fn update_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {
                "type": "string",
                "description": "Free-form Markdown state of the current session"
            },
            "tags": { "type": "array", "items": { "type": "string" } },
            "metadata": { "description": "Opaque JSON carried through untouched" },
            "context": { "description": "Opaque JSON carried through untouched" },
            "checkpoint": { "description": "Opaque JSON carried through untouched" },
            "relatedItems": { "type": "array", "items": { "type": "integer" } }
        },
        "required": ["content"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateArgs {
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    metadata: Option<Value>,
    context: Option<Value>,
    checkpoint: Option<Value>,
    #[serde(default)]
    related_items: Vec<i64>,
}

/// Opaque payloads are stored as strings; a JSON object or array is
/// serialized, a string passes through.
fn opaque_to_string(value: Option<Value>) -> Option<String> {
    value.map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

pub async fn execute_get(store: &Arc<Store>, _args: Option<Value>) -> ToolResult {
    match store.get_current_state()? {
        Some(state) => Ok(serde_json::to_value(state)?),
        None => Ok(json!({ "state": Value::Null })),
    }
}

pub async fn execute_update(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: UpdateArgs = parse_args(args)?;
    let state = store.update_current_state(UpdateStateInput {
        content: args.content,
        tags: args.tags,
        metadata: opaque_to_string(args.metadata),
        context: opaque_to_string(args.context),
        checkpoint: opaque_to_string(args.checkpoint),
        related_items: args.related_items,
    })?;
    Ok(serde_json::to_value(state)?)
}
