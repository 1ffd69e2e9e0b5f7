//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::conversation::Conversation;
use crate::db::{Database, DbError};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::mcp::McpToolbox;
use crate::tools::{ToolError, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Whole-conversation storage keyed by session id
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation, seeding a fresh one if none is stored
    async fn load(&self, session_id: &str) -> Result<Conversation, DbError>;

    /// Overwrite the stored conversation
    async fn save(&self, conversation: &Conversation) -> Result<(), DbError>;

    /// Prompt for the system turn that seeds new and reset conversations
    fn system_prompt(&self) -> &str;
}

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    #[allow(dead_code)] // API completeness
    fn model_id(&self) -> &str;
}

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Tools currently offered to the model
    async fn list_tools(&self) -> Vec<ToolSpec>;

    /// Invoke a tool by name
    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn load(&self, session_id: &str) -> Result<Conversation, DbError> {
        (**self).load(session_id).await
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), DbError> {
        (**self).save(conversation).await
    }

    fn system_prompt(&self) -> &str {
        (**self).system_prompt()
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn list_tools(&self) -> Vec<ToolSpec> {
        (**self).list_tools().await
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        (**self).invoke(name, arguments).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a conversation store
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for DatabaseStorage {
    async fn load(&self, session_id: &str) -> Result<Conversation, DbError> {
        self.db.load_conversation(session_id)
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), DbError> {
        self.db.save_conversation(conversation)
    }

    fn system_prompt(&self) -> &str {
        self.db.system_prompt()
    }
}

/// Adapter to use any LLM service (usually the retrying, logging stack) as
/// the runtime's client
pub struct ServiceLlmClient {
    service: Arc<dyn LlmService>,
}

impl ServiceLlmClient {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.service.complete(request).await
    }

    fn model_id(&self) -> &str {
        self.service.model_id()
    }
}

/// Adapter exposing the registered MCP servers as a tool executor.
///
/// The server list is read from the database on every call so servers added
/// or removed through the API take effect on the next model step.
pub struct McpToolExecutor {
    db: Database,
    toolbox: McpToolbox,
}

impl McpToolExecutor {
    pub fn new(db: Database, toolbox: McpToolbox) -> Self {
        Self { db, toolbox }
    }

    fn registry(&self) -> Arc<crate::tools::ToolRegistry> {
        let servers = self.db.list_mcp_servers().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read MCP servers, using fallback");
            Vec::new()
        });
        self.toolbox.registry_for(&servers)
    }
}

#[async_trait]
impl ToolExecutor for McpToolExecutor {
    async fn list_tools(&self) -> Vec<ToolSpec> {
        self.registry().list_tools().await
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        self.registry().invoke(name, arguments).await
    }
}
