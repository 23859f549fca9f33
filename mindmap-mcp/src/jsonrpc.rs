//! JSON-RPC 2.0 message types and stream framing. Supports two framings
//! over the same stdio stream: plain line-delimited JSON (one object per
//! line) and LSP-style `Content-Length`-prefixed framing, auto-detected
//! per message (spec.md §6.2). Grounded in the teacher's
//! `memory-mcp/src/jsonrpc.rs`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Read, Write};

pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// An incoming JSON-RPC request or notification (`id` absent).
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC error object (spec.md §6.2 error codes).
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// An outgoing JSON-RPC response. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    #[must_use]
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: default_version(), id, result: Some(result), error: None }
    }

    #[must_use]
    pub fn failure(id: Option<Value>, error: RpcError) -> Self {
        Self { jsonrpc: default_version(), id, result: None, error: Some(error) }
    }
}

/// Read one message body from `reader`, auto-detecting framing.
///
/// If the first non-empty line starts with `Content-Length:`, headers are
/// read until a blank line and exactly that many bytes are read as the
/// body (LSP framing). Otherwise the line itself is the body
/// (line-delimited framing). Returns `Ok(None)` at EOF.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut first_line = String::new();
    loop {
        first_line.clear();
        let bytes_read = reader.read_line(&mut first_line)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        if !first_line.trim().is_empty() {
            break;
        }
    }

    let trimmed = first_line.trim_end();
    if let Some(len_str) = trimmed.strip_prefix("Content-Length:") {
        let content_length: usize = len_str
            .trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad Content-Length: {e}")))?;

        // Consume remaining headers up to the blank separator line.
        loop {
            let mut header_line = String::new();
            if reader.read_line(&mut header_line)? == 0 {
                return Ok(None);
            }
            if header_line.trim().is_empty() {
                break;
            }
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body)?;
        Ok(Some(String::from_utf8_lossy(&body).into_owned()))
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

/// Write one response. When `framed` is set, uses `Content-Length`
/// framing to match whatever framing the request arrived with;
/// otherwise writes a single line of JSON followed by `\n`.
pub fn write_message<W: Write>(writer: &mut W, framed: bool, body: &str) -> io::Result<()> {
    if framed {
        write!(writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
    } else {
        writeln!(writer, "{body}")?;
    }
    writer.flush()
}
