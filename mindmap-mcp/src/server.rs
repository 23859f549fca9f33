//! Method dispatch for the 8 JSON-RPC operations (spec.md §6.2).
//! Grounded in the teacher's `memory-mcp/src/server/mod.rs` dispatch
//! loop; the sandboxing, auditing, and rate-limiting machinery that
//! surrounded it there is out of scope here (SPEC_FULL.md §6).

use crate::jsonrpc::{RpcError, RpcRequest, RpcResponse};
use crate::tool_definitions;
use async_trait::async_trait;
use mindmap_core::error::Error as CoreError;
use mindmap_core::pipeline::{QueryRequest, UpdateFromTaskRequest};
use mindmap_core::types::{Edge, Node};
use mindmap_core::MindMap;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, instrument};

#[derive(Debug, Deserialize)]
struct ScanProjectParams {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

fn core_error_to_rpc(err: CoreError) -> RpcError {
    if err.is_recoverable() {
        RpcError::new(RpcError::INTERNAL_ERROR, err.to_string())
    } else {
        RpcError::new(RpcError::INVALID_PARAMS, err.to_string())
    }
}

fn invalid_params(err: serde_json::Error) -> RpcError {
    RpcError::new(RpcError::INVALID_PARAMS, format!("invalid params: {err}"))
}

/// One dispatchable tool. `async_trait` mirrors the teacher's async
/// per-method dispatch even though today every handler is CPU-bound
/// (`MindMap`'s locks are synchronous, `parking_lot`-based).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, mindmap: &MindMap, params: Value) -> Result<Value, RpcError>;
}

struct QueryHandler;
#[async_trait]
impl ToolHandler for QueryHandler {
    async fn call(&self, mindmap: &MindMap, params: Value) -> Result<Value, RpcError> {
        let request: QueryRequest = serde_json::from_value(params).map_err(invalid_params)?;
        let response = mindmap.query(request).map_err(core_error_to_rpc)?;
        serde_json::to_value(response).map_err(|e| RpcError::new(RpcError::INTERNAL_ERROR, e.to_string()))
    }
}

struct UpdateFromTaskHandler;
#[async_trait]
impl ToolHandler for UpdateFromTaskHandler {
    async fn call(&self, mindmap: &MindMap, params: Value) -> Result<Value, RpcError> {
        let request: UpdateFromTaskRequest = serde_json::from_value(params).map_err(invalid_params)?;
        mindmap.update_from_task(request);
        Ok(json!({"acknowledged": true}))
    }
}

struct ScanProjectHandler;
#[async_trait]
impl ToolHandler for ScanProjectHandler {
    async fn call(&self, mindmap: &MindMap, params: Value) -> Result<Value, RpcError> {
        let p: ScanProjectParams = serde_json::from_value(params).map_err(invalid_params)?;
        let report = mindmap.scan_project(p.nodes, p.edges);
        Ok(json!({
            "nodes_inserted": report.nodes_inserted,
            "nodes_merged": report.nodes_merged,
            "edges_inserted": report.edges_inserted,
            "edges_reinforced": report.edges_reinforced,
            "edges_rejected": report.edges_rejected,
        }))
    }
}

struct GetStatsHandler;
#[async_trait]
impl ToolHandler for GetStatsHandler {
    async fn call(&self, mindmap: &MindMap, _params: Value) -> Result<Value, RpcError> {
        let stats = mindmap.get_stats();
        let nodes_by_kind: serde_json::Map<String, Value> = stats
            .nodes_by_kind
            .into_iter()
            .map(|(k, v)| (format!("{k:?}").to_lowercase(), json!(v)))
            .collect();
        Ok(json!({
            "node_count": stats.node_count,
            "edge_count": stats.edge_count,
            "average_confidence": stats.average_confidence,
            "nodes_by_kind": nodes_by_kind,
        }))
    }
}

struct GetCacheStatsHandler;
#[async_trait]
impl ToolHandler for GetCacheStatsHandler {
    async fn call(&self, mindmap: &MindMap, _params: Value) -> Result<Value, RpcError> {
        let metrics = mindmap.get_cache_stats();
        Ok(json!({
            "hits": metrics.hits,
            "misses": metrics.misses,
            "evictions": metrics.evictions,
            "invalidations": metrics.invalidations,
            "entry_count": metrics.entry_count,
            "size_bytes": metrics.size_bytes,
            "hit_rate": metrics.hit_rate(),
        }))
    }
}

struct ClearCacheHandler;
#[async_trait]
impl ToolHandler for ClearCacheHandler {
    async fn call(&self, mindmap: &MindMap, _params: Value) -> Result<Value, RpcError> {
        mindmap.clear_cache();
        Ok(json!({"cleared": true}))
    }
}

struct GetHebbianStatsHandler;
#[async_trait]
impl ToolHandler for GetHebbianStatsHandler {
    async fn call(&self, mindmap: &MindMap, _params: Value) -> Result<Value, RpcError> {
        let stats = mindmap.get_hebbian_stats();
        Ok(json!({
            "queued_events": stats.queued_events,
            "dropped_events": stats.dropped_events,
            "edges_reinforced": stats.edges_reinforced,
            "edges_created": stats.edges_created,
            "edges_pruned": stats.edges_pruned,
            "transitive_edges_created": stats.transitive_edges_created,
        }))
    }
}

struct GetInhibitoryStatsHandler;
#[async_trait]
impl ToolHandler for GetInhibitoryStatsHandler {
    async fn call(&self, mindmap: &MindMap, _params: Value) -> Result<Value, RpcError> {
        let stats = mindmap.get_inhibitory_stats();
        Ok(json!({
            "pattern_count": stats.pattern_count,
            "patterns_created": stats.patterns_created,
            "patterns_reinforced": stats.patterns_reinforced,
            "patterns_pruned": stats.patterns_pruned,
        }))
    }
}

struct ListToolsHandler;
#[async_trait]
impl ToolHandler for ListToolsHandler {
    async fn call(&self, _mindmap: &MindMap, _params: Value) -> Result<Value, RpcError> {
        let tools: Vec<Value> = tool_definitions::all()
            .into_iter()
            .map(|t| json!({"name": t.name, "description": t.description, "input_schema": t.input_schema}))
            .collect();
        Ok(json!({"tools": tools}))
    }
}

/// Dispatches JSON-RPC requests to the mind map engine.
pub struct McpServer {
    mindmap: Arc<MindMap>,
}

impl McpServer {
    #[must_use]
    pub fn new(mindmap: Arc<MindMap>) -> Self {
        Self { mindmap }
    }

    fn handler_for(method: &str) -> Option<Box<dyn ToolHandler>> {
        match method {
            "query" => Some(Box::new(QueryHandler)),
            "update_from_task" => Some(Box::new(UpdateFromTaskHandler)),
            "scan_project" => Some(Box::new(ScanProjectHandler)),
            "get_stats" => Some(Box::new(GetStatsHandler)),
            "get_cache_stats" => Some(Box::new(GetCacheStatsHandler)),
            "clear_cache" => Some(Box::new(ClearCacheHandler)),
            "get_hebbian_stats" => Some(Box::new(GetHebbianStatsHandler)),
            "get_inhibitory_stats" => Some(Box::new(GetInhibitoryStatsHandler)),
            "list_tools" => Some(Box::new(ListToolsHandler)),
            _ => None,
        }
    }

    /// Dispatch one request and build its response. Notifications (no
    /// `id`) still run, but `handle_message` in the binary skips writing
    /// their response.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let Some(handler) = Self::handler_for(&request.method) else {
            return RpcResponse::failure(
                request.id,
                RpcError::new(RpcError::METHOD_NOT_FOUND, format!("unknown method: {}", request.method)),
            );
        };

        match handler.call(&self.mindmap, request.params).await {
            Ok(result) => RpcResponse::success(request.id, result),
            Err(err) => {
                error!(code = err.code, message = %err.message, "tool call failed");
                RpcResponse::failure(request.id, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::MindMapConfig;
    use serde_json::json;

    fn server() -> McpServer {
        McpServer::new(Arc::new(MindMap::new(MindMapConfig::default())))
    }

    #[tokio::test]
    async fn unknown_method_returns_method_not_found() {
        let server = server();
        let request = RpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: "bogus".into(),
            params: Value::Null,
        };
        let response = server.handle(request).await;
        assert_eq!(response.error.unwrap().code, RpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn get_stats_on_empty_graph_reports_zero() {
        let server = server();
        let request = RpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: "get_stats".into(),
            params: Value::Null,
        };
        let response = server.handle(request).await;
        let result = response.result.unwrap();
        assert_eq!(result["node_count"], json!(0));
    }

    #[tokio::test]
    async fn scan_then_query_round_trips_through_json() {
        let server = server();
        let scan_request = RpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: "scan_project".into(),
            params: json!({
                "nodes": [{
                    "id": "a", "kind": "file", "name": "auth.rs", "path": "src/auth.rs",
                    "confidence": 1.0, "last_updated": chrono::Utc::now().to_rfc3339(),
                    "languages": [], "frameworks": [], "metadata": {}
                }],
                "edges": []
            }),
        };
        let response = server.handle(scan_request).await;
        assert!(response.error.is_none());

        let query_request = RpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(2)),
            method: "query".into(),
            params: json!({"query_text": "auth"}),
        };
        let response = server.handle(query_request).await;
        assert!(response.error.is_none());
    }
}
