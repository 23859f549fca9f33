//! Stdio entry point: loads a snapshot if one exists, serves JSON-RPC
//! requests from stdin until EOF, then saves a snapshot on the way out.
//! Grounded in the teacher's `memory-mcp/src/bin/memory-mcp-server.rs`.

use anyhow::{Context, Result};
use mindmap_core::pipeline::run_maintenance_loop;
use mindmap_core::{MindMap, MindMapConfig};
use mindmap_mcp::jsonrpc::{read_message, write_message, RpcError, RpcRequest, RpcResponse};
use mindmap_mcp::McpServer;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

fn base_dir() -> PathBuf {
    std::env::var("MINDMAP_HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let base = base_dir();
    let mindmap = Arc::new(MindMap::new(MindMapConfig::default()));
    match mindmap.load_snapshot(&base) {
        Ok(true) => info!(path = %base.display(), "restored graph from snapshot"),
        Ok(false) => info!(path = %base.display(), "no snapshot found, starting with an empty graph"),
        Err(e) => warn!(error = %e, "failed to load snapshot, starting empty"),
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let maintenance_handle = tokio::spawn(run_maintenance_loop(mindmap.clone(), shutdown_rx));

    let server = McpServer::new(mindmap.clone());
    run_stdio_loop(&server).await.context("stdio loop failed")?;

    let _ = shutdown_tx.send(true);
    let _ = maintenance_handle.await;

    mindmap.save_snapshot(&base).context("failed to save snapshot on shutdown")?;
    info!(path = %base.display(), "saved snapshot on shutdown");
    Ok(())
}

async fn run_stdio_loop(server: &McpServer) -> Result<()> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = std::io::stdout();

    loop {
        let message = match read_message(&mut reader) {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read request, stopping");
                break;
            }
        };
        if message.trim().is_empty() {
            continue;
        }

        let request: RpcRequest = match serde_json::from_str(&message) {
            Ok(request) => request,
            Err(e) => {
                write_response(
                    &stdout,
                    &RpcResponse::failure(None, RpcError::new(RpcError::PARSE_ERROR, e.to_string())),
                )?;
                continue;
            }
        };

        let has_id = request.id.is_some();
        let response = server.handle(request).await;
        if has_id {
            write_response(&stdout, &response)?;
        }
    }
    Ok(())
}

fn write_response(stdout: &std::io::Stdout, response: &RpcResponse) -> Result<()> {
    let body = serde_json::to_string(response)?;
    let mut lock = stdout.lock();
    write_message(&mut lock, false, &body)?;
    Ok(())
}
