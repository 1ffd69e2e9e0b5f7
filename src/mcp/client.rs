//! Streamable-HTTP MCP client

use super::protocol::{
    call_error_text, initialize_params, parse_body, parse_tools_page, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, SESSION_HEADER,
};
use super::McpSettings;
use crate::tools::{ToolError, ToolProvider, ToolSpec};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

const ACCEPT: &str = "application/json, text/event-stream";

/// A successful POST and the session id the server assigned, if any
type Posted = (reqwest::Response, Option<String>);

#[derive(Debug, Error)]
pub enum McpError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("server error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    fn is_retryable(&self) -> bool {
        match self {
            McpError::Transport(_) => true,
            McpError::Status { status, .. } => *status == 429 || *status >= 500,
            McpError::Rpc(_) | McpError::Protocol(_) => false,
        }
    }
}

impl From<reqwest::Error> for McpError {
    fn from(e: reqwest::Error) -> Self {
        McpError::Transport(e.to_string())
    }
}

impl From<McpError> for ToolError {
    fn from(e: McpError) -> Self {
        match e {
            McpError::Rpc(err) if err.code == -32602 => ToolError::InvalidArguments(err.message),
            McpError::Rpc(err) => ToolError::Provider(err.message),
            other => ToolError::Transport(other.to_string()),
        }
    }
}

/// Negotiated session; `id` is absent for stateless servers
#[derive(Debug, Clone)]
struct Session {
    id: Option<String>,
}

/// One MCP server reached over streamable HTTP
pub struct McpClient {
    name: String,
    url: String,
    http: Client,
    retries: u32,
    retry_backoff: Duration,
    session: Mutex<Option<Session>>,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        settings: &McpSettings,
    ) -> Result<Self, McpError> {
        let http = Client::builder().timeout(settings.read_timeout).build()?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            http,
            retries: settings.retries,
            retry_backoff: settings.retry_backoff,
            session: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a request, negotiating a session first if needed.
    /// A session the server has forgotten (404) is renegotiated once.
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let session = self.ensure_session().await?;
        match self.call_with_retry(method, &params, session.id.as_deref()).await {
            Err(McpError::Status { status: 404, .. }) if session.id.is_some() => {
                tracing::info!(server = %self.name, "MCP session expired, reconnecting");
                *self.session.lock().await = None;
                let session = self.ensure_session().await?;
                self.call_with_retry(method, &params, session.id.as_deref()).await
            }
            other => other,
        }
    }

    async fn ensure_session(&self) -> Result<Session, McpError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::call(id, "initialize", initialize_params());
        let (response, session_id) = self.with_retry(|| self.post(&request, None)).await?;
        let info = Self::decode(response, id).await?;
        let protocol = info
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(
            server = %self.name,
            protocol = %protocol,
            stateful = session_id.is_some(),
            "MCP session initialized"
        );

        let notification = JsonRpcRequest::notification("notifications/initialized");
        self.post(&notification, session_id.as_deref()).await?;

        let session = Session { id: session_id };
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn call_with_retry(
        &self,
        method: &str,
        params: &Value,
        session_id: Option<&str>,
    ) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::call(id, method, params.clone());
        let (response, _) = self.with_retry(|| self.post(&request, session_id)).await?;
        Self::decode(response, id).await
    }

    async fn with_retry<F, Fut>(&self, mut send: F) -> Result<Posted, McpError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Posted, McpError>>,
    {
        let mut attempt = 0;
        loop {
            match send().await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let delay = self.retry_backoff * (1 << attempt.min(16));
                    attempt += 1;
                    tracing::warn!(
                        server = %self.name,
                        attempt,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Retrying MCP request"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// POST one message; returns the response and any session id it assigned
    async fn post(
        &self,
        message: &JsonRpcRequest,
        session_id: Option<&str>,
    ) -> Result<Posted, McpError> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(header::ACCEPT, ACCEPT)
            .json(message);
        if let Some(session_id) = session_id {
            builder = builder.header(SESSION_HEADER, session_id);
        }

        tracing::debug!(server = %self.name, method = %message.method, "MCP request");
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let assigned = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        Ok((response, assigned))
    }

    async fn decode(response: reqwest::Response, id: u64) -> Result<Value, McpError> {
        if response.status() == StatusCode::ACCEPTED {
            return Err(McpError::Protocol(format!("no response body for request {id}")));
        }
        let is_event_stream = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let body = response.text().await?;

        let JsonRpcResponse { result, error, .. } =
            parse_body(&body, is_event_stream, id).map_err(McpError::Protocol)?;
        match (result, error) {
            (_, Some(error)) => Err(McpError::Rpc(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(McpError::Protocol(format!(
                "response to request {id} has neither result nor error"
            ))),
        }
    }
}

#[async_trait]
impl ToolProvider for McpClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let (page, next) = parse_tools_page(result)
                .map_err(|e| ToolError::Transport(format!("invalid tools/list result: {e}")))?;
            tools.extend(page);
            match next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        if let Some(message) = call_error_text(&result) {
            return Err(ToolError::Provider(message));
        }
        Ok(result)
    }
}
