//! Tool registry over remote tool providers
//!
//! Tools are not implemented in-process: every tool belongs to a provider
//! (an MCP server). The registry lists them in provider order, turns them into
//! function-calling schemas for the model, and routes invocations back to the
//! provider that listed the tool.

use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// A tool as advertised by its provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema for the tool's arguments
    pub input_schema: Value,
}

/// Failure to run a tool. Always reported back to the model as a tool turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
    #[error("Tool failed: {0}")]
    Provider(String),
    #[error("Tool provider unreachable: {0}")]
    Transport(String),
}

/// A source of tools
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Human-readable provider name for logs
    fn name(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError>;
}

/// Collection of providers in priority order
pub struct ToolRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    /// Tool name to provider index, from the most recent listing
    routes: RwLock<Option<Vec<(String, usize)>>>,
}

impl ToolRegistry {
    pub fn new(providers: Vec<Arc<dyn ToolProvider>>) -> Self {
        Self {
            providers,
            routes: RwLock::new(None),
        }
    }

    /// List every tool from every provider.
    ///
    /// A provider that fails to list is logged and skipped. When two providers
    /// expose the same name the earlier provider wins.
    pub async fn list_tools(&self) -> Vec<ToolSpec> {
        let mut tools = Vec::new();
        let mut routes: Vec<(String, usize)> = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            match provider.list_tools().await {
                Ok(listed) => {
                    tracing::debug!(provider = %provider.name(), count = listed.len(), "Listed tools");
                    for tool in listed {
                        if routes.iter().any(|(name, _)| name == &tool.name) {
                            tracing::warn!(
                                provider = %provider.name(),
                                tool = %tool.name,
                                "Duplicate tool name, keeping the earlier provider"
                            );
                            continue;
                        }
                        routes.push((tool.name.clone(), index));
                        tools.push(tool);
                    }
                }
                Err(e) => {
                    tracing::warn!(provider = %provider.name(), error = %e, "Failed to list tools");
                }
            }
        }

        *self.routes.write().await = Some(routes);
        tools
    }

    /// Function-calling schema for the model
    pub fn to_model_schema(tools: &[ToolSpec]) -> Vec<ToolDefinition> {
        tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    /// Invoke a tool by name on the provider that listed it.
    ///
    /// Routes are shared by every session, so a miss re-lists once before
    /// giving up.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let index = match self.route(name).await {
            Some(index) => index,
            None => {
                tracing::debug!(tool = %name, "No route for tool, listing again");
                self.list_tools().await;
                self.route(name)
                    .await
                    .ok_or_else(|| ToolError::NotFound(name.to_string()))?
            }
        };

        let provider = &self.providers[index];
        tracing::info!(provider = %provider.name(), tool = %name, "Invoking tool");
        provider.call_tool(name, arguments).await
    }

    async fn route(&self, name: &str) -> Option<usize> {
        self.routes
            .read()
            .await
            .as_ref()
            .and_then(|routes| routes.iter().find(|(n, _)| n == name).map(|(_, i)| *i))
    }
}
