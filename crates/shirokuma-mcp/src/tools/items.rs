//! Item CRUD tools: create_item, get_item, update_item, delete_item.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use shirokuma_core::{CreateItemInput, Priority, ServiceError, Store, UpdateItemInput};

use super::{parse_args, parse_datetime_opt, ToolResult};

pub fn create_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {
                "type": "string",
                "pattern": "^[a-z0-9_]+$",
                "description": "Item type label, e.g. 'issue', 'plan', 'doc', 'knowledge'"
            },
            "title": { "type": "string", "minLength": 1, "maxLength": 200 },
            "description": { "type": "string", "description": "Short one-liner" },
            "content": { "type": "string", "description": "Long Markdown body" },
            "status": { "type": "string", "description": "Status name (default: 'Open')" },
            "priority": {
                "type": "string",
                "enum": ["CRITICAL", "HIGH", "MEDIUM", "LOW", "MINIMAL"],
                "description": "Default: MEDIUM"
            },
            "category": { "type": "string" },
            "startDate": { "type": "string", "description": "ISO 8601 date or datetime" },
            "endDate": { "type": "string", "description": "ISO 8601 date or datetime" },
            "version": { "type": "string", "description": "X.Y.Z" },
            "tags": { "type": "array", "items": { "type": "string" } },
            "related": {
                "type": "array",
                "items": { "type": "integer" },
                "description": "Item ids to relate bidirectionally; unknown ids are skipped"
            }
        },
        "required": ["type", "title"]
    })
}

pub fn get_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer", "description": "Item id" }
        },
        "required": ["id"]
    })
}

pub fn update_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer" },
            "type": { "type": "string", "pattern": "^[a-z0-9_]+$" },
            "title": { "type": "string", "minLength": 1, "maxLength": 200 },
            "description": { "type": "string" },
            "content": { "type": "string" },
            "status": { "type": "string" },
            "priority": { "type": "string", "enum": ["CRITICAL", "HIGH", "MEDIUM", "LOW", "MINIMAL"] },
            "category": { "type": "string" },
            "startDate": { "type": "string" },
            "endDate": { "type": "string" },
            "version": { "type": "string" },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Replaces the stored tag set"
            },
            "related": {
                "type": "array",
                "items": { "type": "integer" },
                "description": "Replaces the stored related set"
            }
        },
        "required": ["id"]
    })
}

pub fn delete_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer" }
        },
        "required": ["id"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateArgs {
    #[serde(rename = "type")]
    item_type: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    content: String,
    status: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    version: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    related: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateArgs {
    id: i64,
    #[serde(rename = "type")]
    item_type: Option<String>,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    version: Option<String>,
    tags: Option<Vec<String>>,
    related: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdArgs {
    id: i64,
}

fn parse_priority(name: &str) -> Result<Priority, ServiceError> {
    Priority::parse_name(name).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "priority must be one of CRITICAL/HIGH/MEDIUM/LOW/MINIMAL, got '{name}'"
        ))
    })
}

pub async fn execute_create(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: CreateArgs = parse_args(args)?;
    let input = CreateItemInput {
        item_type: args.item_type,
        title: args.title,
        description: args.description,
        content: args.content,
        status: args.status,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        category: args.category,
        start_date: parse_datetime_opt(&args.start_date)?,
        end_date: parse_datetime_opt(&args.end_date)?,
        version: args.version,
        tags: args.tags,
        related: args.related,
    };
    let item = store.create_item(input)?;
    Ok(serde_json::to_value(item)?)
}

pub async fn execute_get(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: IdArgs = parse_args(args)?;
    let item = store.get_item(args.id)?;
    Ok(serde_json::to_value(item)?)
}

pub async fn execute_update(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: UpdateArgs = parse_args(args)?;
    let input = UpdateItemInput {
        id: args.id,
        item_type: args.item_type,
        title: args.title,
        description: args.description,
        content: args.content,
        status: args.status,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        category: args.category,
        start_date: parse_datetime_opt(&args.start_date)?,
        end_date: parse_datetime_opt(&args.end_date)?,
        version: args.version,
        tags: args.tags,
        related: args.related,
    };
    let item = store.update_item(input)?;
    Ok(serde_json::to_value(item)?)
}

pub async fn execute_delete(store: &Arc<Store>, args: Option<Value>) -> ToolResult {
    let args: IdArgs = parse_args(args)?;
    store.delete_item(args.id)?;
    Ok(json!({ "deleted": args.id }))
}
