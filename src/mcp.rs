//! MCP tool providers
//!
//! Each registered MCP server becomes one provider. With no servers
//! registered, a single server from `MCP_SERVER_URL` is used instead.

mod client;
mod protocol;

pub use client::McpClient;

use crate::db::McpServer;
use crate::tools::{ToolProvider, ToolRegistry};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000/mcp";

/// Connection settings shared by every MCP client
#[derive(Debug, Clone)]
pub struct McpSettings {
    /// Server used when none are registered
    pub fallback_url: String,
    pub read_timeout: Duration,
    /// Retries after the first attempt, on transport errors and 5xx
    pub retries: u32,
    /// Base delay; attempt n waits `retry_backoff * 2^n`
    pub retry_backoff: Duration,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            fallback_url: DEFAULT_SERVER_URL.to_string(),
            read_timeout: Duration::from_secs(60),
            retries: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl McpSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fallback_url: std::env::var("MCP_SERVER_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.fallback_url),
            ..defaults
        }
    }
}

/// (name, url) pairs to connect to, in priority order
fn endpoints(servers: &[McpServer], settings: &McpSettings) -> Vec<(String, String)> {
    if servers.is_empty() {
        return vec![("default".to_string(), settings.fallback_url.clone())];
    }
    servers
        .iter()
        .map(|s| (s.name.clone(), s.url.clone()))
        .collect()
}

/// Build a registry over the given servers, or over the fallback server
pub fn build_registry(servers: &[McpServer], settings: &McpSettings) -> ToolRegistry {
    let mut providers: Vec<Arc<dyn ToolProvider>> = Vec::new();
    for (name, url) in endpoints(servers, settings) {
        match McpClient::new(name.clone(), url.clone(), settings) {
            Ok(client) => providers.push(Arc::new(client)),
            Err(e) => tracing::warn!(server = %name, url = %url, error = %e, "Skipping MCP server"),
        }
    }
    ToolRegistry::new(providers)
}

/// Keeps one registry alive while the server list is unchanged, so MCP
/// sessions and tool routes survive across requests.
pub struct McpToolbox {
    settings: McpSettings,
    current: Mutex<Option<(Vec<(String, String)>, Arc<ToolRegistry>)>>,
}

impl McpToolbox {
    pub fn new(settings: McpSettings) -> Self {
        Self {
            settings,
            current: Mutex::new(None),
        }
    }

    /// Registry for this server list, rebuilt only when the list changed
    pub fn registry_for(&self, servers: &[McpServer]) -> Arc<ToolRegistry> {
        let wanted = endpoints(servers, &self.settings);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((known, registry)) = current.as_ref() {
            if *known == wanted {
                return Arc::clone(registry);
            }
        }

        tracing::info!(servers = wanted.len(), "Connecting MCP tool servers");
        let registry = Arc::new(build_registry(servers, &self.settings));
        *current = Some((wanted, Arc::clone(&registry)));
        registry
    }
}
