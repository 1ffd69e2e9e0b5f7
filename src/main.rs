//! MCP Chat - a chat service that asks before it runs tools
//!
//! The model may request tools served by MCP servers; each request pauses the
//! conversation until the user confirms or declines it.

mod api;
mod conversation;
mod db;
mod llm;
mod mcp;
mod projection;
mod runtime;
mod state_machine;
mod tools;

use api::{create_router, AppState};
use db::Database;
use llm::{LlmConfig, LlmService, LoggingService, OpenAIService, RetryingService};
use mcp::{McpSettings, McpToolbox};
use runtime::{
    ConversationRuntime, DatabaseStorage, LlmClient, McpToolExecutor, ServiceLlmClient,
    ToolExecutor,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcp_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("MCP_CHAT_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.mcp-chat/mcp_chat.db")
    });

    let port: u16 = std::env::var("MCP_CHAT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let system_prompt = std::env::var("SYSTEM_PROMPT")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path, &system_prompt)?;

    // Model client: provider, then retries, then logging around each attempt
    let llm_config = LlmConfig::from_env();
    if llm_config.api_key.is_none() {
        tracing::warn!("No LLM API key configured. Set OPENAI_API_KEY.");
    }
    let provider: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(
        OpenAIService::new(&llm_config)?,
    )));
    let service: Arc<dyn LlmService> =
        Arc::new(RetryingService::new(provider, llm_config.max_attempts));
    tracing::info!(
        model = %service.model_id(),
        base_url = %llm_config.base_url,
        max_attempts = llm_config.max_attempts,
        "LLM client initialized"
    );

    // Tools from the registered MCP servers, or the fallback server
    let mcp_settings = McpSettings::from_env();
    tracing::info!(fallback = %mcp_settings.fallback_url, "MCP tool servers configured");
    let tools: Arc<dyn ToolExecutor> = Arc::new(McpToolExecutor::new(
        db.clone(),
        McpToolbox::new(mcp_settings),
    ));
    let llm: Arc<dyn LlmClient> = Arc::new(ServiceLlmClient::new(service));

    let runtime = ConversationRuntime::new(DatabaseStorage::new(db.clone()), llm, tools);
    let state = AppState::new(runtime, db);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("MCP Chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
