//! Static tool schema for the 8 JSON-RPC operations (spec.md §6.2).
//! Exposed through a `list_tools` call the way an MCP client discovers
//! what it can invoke. Grounded in the teacher's
//! `memory-mcp/src/server/tool_definitions.rs`.

use serde_json::{json, Value};

/// One tool's name, description, and JSON Schema input shape.
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[must_use]
pub fn all() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "query",
            description: "Run a spreading-activation query over the knowledge graph and return ranked results.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query_text": {"type": "string"},
                    "type_filter": {"type": "string", "enum": ["file", "directory", "function", "class", "pattern", "error", "concept"]},
                    "hop_cap": {"type": "integer", "minimum": 1, "maximum": 10},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 200},
                    "context": {"type": "object"},
                    "bypass_inhibition": {"type": "boolean"},
                    "bypass_cache": {"type": "boolean"},
                    "use_activation": {"type": "boolean"},
                    "bypass_hebbian": {"type": "boolean"}
                },
                "required": ["query_text"]
            }),
        },
        ToolDefinition {
            name: "update_from_task",
            description: "Record the outcome of using a set of nodes in a real task, feeding success history and failure inhibition.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "node_ids": {"type": "array", "items": {"type": "string"}},
                    "description": {"type": "string"},
                    "outcome": {"type": "string", "enum": ["success", "error", "partial"]},
                    "error_type": {"type": "string"},
                    "error_message": {"type": "string"},
                    "files_involved": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["node_ids", "description", "outcome"]
            }),
        },
        ToolDefinition {
            name: "scan_project",
            description: "Bulk-ingest nodes and edges discovered by scanning a project.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "nodes": {"type": "array"},
                    "edges": {"type": "array"}
                },
                "required": ["nodes", "edges"]
            }),
        },
        ToolDefinition {
            name: "get_stats",
            description: "Return node/edge counts, average confidence, and per-kind breakdown.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "get_cache_stats",
            description: "Return query cache hit rate, entry count, and size.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "clear_cache",
            description: "Drop all cached query results.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "get_hebbian_stats",
            description: "Return co-activation learning queue depth and edge counters.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "get_inhibitory_stats",
            description: "Return failure-inhibition pattern counters.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_eight_tools_are_present() {
        let names: Vec<&str> = all().into_iter().map(|t| t.name).collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"query"));
        assert!(names.contains(&"get_inhibitory_stats"));
    }
}
