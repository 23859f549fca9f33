//! JSON-RPC-over-stdio tool surface for the mind map associative query
//! engine (spec.md §6.2). Thin by design: all retrieval and learning
//! logic lives in `mindmap-core`; this crate only frames messages and
//! dispatches them.

pub mod jsonrpc;
pub mod server;
pub mod tool_definitions;

pub use server::McpServer;
