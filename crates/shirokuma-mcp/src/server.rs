//! MCP server core.
//!
//! Routes JSON-RPC requests to the tool handlers and owns the
//! initialization handshake.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolDescription, ToolResultContent,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::tools;
use shirokuma_core::Store;

/// MCP server implementation
pub struct McpServer {
    store: Arc<Store>,
    initialized: bool,
}

impl McpServer {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            initialized: false,
        }
    }

    /// Handle an incoming JSON-RPC request. Returns `None` for
    /// notifications.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("handling request: {}", request.method);

        if !self.initialized
            && request.method != "initialize"
            && request.method != "notifications/initialized"
        {
            warn!("rejecting '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::server_not_initialized(),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "notifications/initialized" => return None,
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("unknown method: {method}");
                Err(JsonRpcError::method_not_found(&format!(
                    "Unknown method: {method}"
                )))
            }
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    fn handle_initialize(
        &mut self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(params) => serde_json::from_value(params)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest::default(),
        };

        // Use the client's protocol version when it is older than ours;
        // clients reject servers that answer with a newer one.
        let negotiated = if request.protocol_version.as_str() < MCP_VERSION {
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;
        info!("MCP session initialized with protocol version {negotiated}");

        let result = InitializeResult {
            protocol_version: negotiated,
            server_info: ServerInfo {
                name: "shirokuma-knowledge-base".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some({
                    let mut map = HashMap::new();
                    map.insert("listChanged".to_string(), serde_json::json!(false));
                    map
                }),
            },
            instructions: Some(
                "Shirokuma is a knowledge base for AI agents. Items (issues, plans, docs, \
                 knowledge, sessions, ...) share one shape; the 'type' field is a free label. \
                 Use search_items with 'key:value' tokens for structured filtering, \
                 get_related_items for graph or hybrid-scored neighbors, and \
                 update_current_state at session end so the next session can resume."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "create_item".to_string(),
                description: Some(
                    "Create a knowledge-base item. Keywords, concepts, a summary, and an \
                     embedding are derived automatically from title/description/content."
                        .to_string(),
                ),
                input_schema: tools::items::create_schema(),
            },
            ToolDescription {
                name: "get_item".to_string(),
                description: Some(
                    "Fetch a fully hydrated item by id (tags, keywords, concepts, related ids)."
                        .to_string(),
                ),
                input_schema: tools::items::get_schema(),
            },
            ToolDescription {
                name: "update_item".to_string(),
                description: Some(
                    "Update fields of an item. Omitted fields are unchanged; supplied tags and \
                     related sets replace the stored ones. Changing title/description/content \
                     re-runs enrichment."
                        .to_string(),
                ),
                input_schema: tools::items::update_schema(),
            },
            ToolDescription {
                name: "delete_item".to_string(),
                description: Some(
                    "Delete an item. All joins and both directions of its relations cascade."
                        .to_string(),
                ),
                input_schema: tools::items::delete_schema(),
            },
            ToolDescription {
                name: "list_items".to_string(),
                description: Some(
                    "Filtered listing: type, statuses (case-insensitive), priorities, tags, \
                     sorting by created/updated/priority."
                        .to_string(),
                ),
                input_schema: tools::listing::list_schema(),
            },
            ToolDescription {
                name: "search_items".to_string(),
                description: Some(
                    "Structured-query search: free text plus 'status:Open type:issue tag:x \
                     date:2025-01-01..' tokens. Unknown status names degrade gracefully."
                        .to_string(),
                ),
                input_schema: tools::listing::search_schema(),
            },
            ToolDescription {
                name: "get_related_items".to_string(),
                description: Some(
                    "Related items: graph BFS over stored relations by default, or hybrid \
                     keyword/concept/embedding scoring when strategy, weights, or thresholds \
                     are supplied."
                        .to_string(),
                ),
                input_schema: tools::related::related_schema(),
            },
            ToolDescription {
                name: "add_relations".to_string(),
                description: Some(
                    "Create bidirectional relations from a source item to each existing target. \
                     Idempotent; unknown targets are skipped."
                        .to_string(),
                ),
                input_schema: tools::related::add_relations_schema(),
            },
            ToolDescription {
                name: "get_current_state".to_string(),
                description: Some(
                    "The single active system state (session continuity record), or null."
                        .to_string(),
                ),
                input_schema: tools::state::get_schema(),
            },
            ToolDescription {
                name: "update_current_state".to_string(),
                description: Some(
                    "Roll the system state forward: previous states stay in history, metrics \
                     are snapshotted, and the new row becomes active."
                        .to_string(),
                ),
                input_schema: tools::state::update_schema(),
            },
            ToolDescription {
                name: "get_stats".to_string(),
                description: Some(
                    "Item counts grouped by type/status/priority plus the top-10 tags."
                        .to_string(),
                ),
                input_schema: tools::stats::stats_schema(),
            },
            ToolDescription {
                name: "get_tags".to_string(),
                description: Some("All tags with use counts.".to_string()),
                input_schema: tools::stats::tags_schema(),
            },
        ];

        serde_json::to_value(ListToolsResult { tools })
            .map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(params) => serde_json::from_value(params)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("Missing tool call parameters")),
        };

        let store = &self.store;
        let result = match request.name.as_str() {
            "create_item" => tools::items::execute_create(store, request.arguments).await,
            "get_item" => tools::items::execute_get(store, request.arguments).await,
            "update_item" => tools::items::execute_update(store, request.arguments).await,
            "delete_item" => tools::items::execute_delete(store, request.arguments).await,
            "list_items" => tools::listing::execute_list(store, request.arguments).await,
            "search_items" => tools::listing::execute_search(store, request.arguments).await,
            "get_related_items" => tools::related::execute_related(store, request.arguments).await,
            "add_relations" => {
                tools::related::execute_add_relations(store, request.arguments).await
            }
            "get_current_state" => tools::state::execute_get(store, request.arguments).await,
            "update_current_state" => tools::state::execute_update(store, request.arguments).await,
            "get_stats" => tools::stats::execute_stats(store, request.arguments).await,
            "get_tags" => tools::stats::execute_tags(store, request.arguments).await,
            name => {
                return Err(JsonRpcError::method_not_found(&format!(
                    "Unknown tool: {name}"
                )));
            }
        };

        let call_result = match result {
            Ok(payload) => CallToolResult {
                content: vec![ToolResultContent {
                    content_type: "text".to_string(),
                    text: serde_json::to_string_pretty(&payload)
                        .unwrap_or_else(|_| payload.to_string()),
                }],
                is_error: Some(false),
            },
            Err(err) => {
                warn!("tool '{}' failed: {err}", request.name);
                CallToolResult {
                    content: vec![ToolResultContent {
                        content_type: "text".to_string(),
                        text: serde_json::json!({
                            "error": { "kind": err.kind(), "message": err.to_string() }
                        })
                        .to_string(),
                    }],
                    is_error: Some(true),
                }
            }
        };

        serde_json::to_value(call_result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }
}
