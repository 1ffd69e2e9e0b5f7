//! JSON-RPC 2.0 envelopes and MCP payloads over streamable HTTP

use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    /// Absent for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn call(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method: method.to_string(),
            params: Some(params),
        }
    }

    pub fn notification(method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method: method.to_string(),
            params: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// `initialize` params for a client that only consumes tools
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

/// Tool entry in a `tools/list` result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "empty_object_schema")]
    input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<WireTool>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// One page of a `tools/list` result
pub fn parse_tools_page(result: Value) -> Result<(Vec<ToolSpec>, Option<String>), serde_json::Error> {
    let page: ListToolsResult = serde_json::from_value(result)?;
    let tools = page
        .tools
        .into_iter()
        .map(|t| ToolSpec {
            name: t.name,
            description: t.description.unwrap_or_default(),
            input_schema: t.input_schema,
        })
        .collect();
    Ok((tools, page.next_cursor))
}

/// If a `tools/call` result reports `isError`, the text it carries
pub fn call_error_text(result: &Value) -> Option<String> {
    if !result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    let text: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    Some(if text.is_empty() {
        "tool reported an error".to_string()
    } else {
        text.join("\n")
    })
}

/// Extract the response for `id` from a response body.
///
/// Streamable HTTP servers answer either with a plain JSON body or with an
/// event stream whose `data:` payloads carry the JSON-RPC messages.
pub fn parse_body(body: &str, is_event_stream: bool, id: u64) -> Result<JsonRpcResponse, String> {
    if !is_event_stream {
        return serde_json::from_str(body).map_err(|e| format!("invalid JSON-RPC body: {e}"));
    }

    for data in sse_data(body) {
        let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&data) else {
            continue;
        };
        let matches = response.id.as_ref().and_then(Value::as_u64) == Some(id);
        if matches && (response.result.is_some() || response.error.is_some()) {
            return Ok(response);
        }
    }
    Err(format!("no response for request {id} in event stream"))
}

/// `data:` payloads of an event stream, one per event
fn sse_data(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !current.is_empty() {
                events.push(current.join("\n"));
                current.clear();
            }
        } else if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        }
    }
    if !current.is_empty() {
        events.push(current.join("\n"));
    }
    events
}
