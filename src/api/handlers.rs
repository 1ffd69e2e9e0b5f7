//! HTTP request handlers

use super::types::{
    ChatRequest, CreateMcpServerRequest, ErrorResponse, McpServerListResponse, SuccessResponse,
    ToolboxResponse,
};
use super::AppState;
use crate::db::{DbError, McpServer};
use crate::projection::ConversationView;
use crate::runtime::RuntimeError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/chat", post(send_chat))
        .route("/api/sessions/:id/confirm", post(confirm_tool))
        .route("/api/sessions/:id/decline", post(decline_tool))
        .route("/api/sessions/:id/reset", post(reset_session))
        // Tools
        .route("/api/toolbox", get(get_toolbox))
        .route(
            "/api/mcp_servers",
            get(list_mcp_servers).post(create_mcp_server),
        )
        .route("/api/mcp_servers/:id/delete", post(delete_mcp_server))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<ConversationView>, AppError> {
    Ok(Json(state.runtime.new_session().await?))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    Ok(Json(state.runtime.view(&id).await?))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ConversationView>, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("Prompt must not be empty".to_string()));
    }
    let _guard = state.lock_session(&id).await;
    Ok(Json(state.runtime.send_message(&id, req.prompt).await?))
}

async fn confirm_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    let _guard = state.lock_session(&id).await;
    Ok(Json(state.runtime.confirm_pending_tool(&id).await?))
}

async fn decline_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    let _guard = state.lock_session(&id).await;
    Ok(Json(state.runtime.decline_pending_tool(&id).await?))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError> {
    let _guard = state.lock_session(&id).await;
    Ok(Json(state.runtime.reset_session(&id).await?))
}

// ============================================================
// Tools and MCP servers
// ============================================================

async fn get_toolbox(State(state): State<AppState>) -> Json<ToolboxResponse> {
    Json(ToolboxResponse {
        tools: state.runtime.toolbox().await,
    })
}

async fn list_mcp_servers(
    State(state): State<AppState>,
) -> Result<Json<McpServerListResponse>, AppError> {
    let servers = state.db.list_mcp_servers()?;
    Ok(Json(McpServerListResponse { servers }))
}

async fn create_mcp_server(
    State(state): State<AppState>,
    Json(req): Json<CreateMcpServerRequest>,
) -> Result<(StatusCode, Json<McpServer>), AppError> {
    let server = state.db.add_mcp_server(&req.name, &req.url)?;
    tracing::info!(id = server.id, name = %server.name, url = %server.url, "MCP server added");
    Ok((StatusCode::CREATED, Json(server)))
}

async fn delete_mcp_server(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_mcp_server(id)?;
    tracing::info!(id, "MCP server removed");
    Ok(Json(SuccessResponse { success: true }))
}

async fn get_version() -> &'static str {
    concat!("mcp_chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Llm(e) => AppError::BadGateway(e.to_string()),
            RuntimeError::Storage(e) => AppError::from(e),
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidServer(msg) => AppError::BadRequest(msg),
            e @ DbError::ServerNotFound(_) => AppError::NotFound(e.to_string()),
            e => {
                tracing::error!(error = %e, "Storage failure");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
