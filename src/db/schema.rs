//! Database schema and record types

use chrono::{DateTime, Utc};
use serde::Serialize;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS chats (
    session_id TEXT PRIMARY KEY,
    tool_confirmation_state TEXT,
    messages TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS mcp_servers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_mcp_servers_name ON mcp_servers(name COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_mcp_servers_created ON mcp_servers(created_at);
";

/// A registered MCP server
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct McpServer {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new MCP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMcpServer {
    pub name: String,
    pub url: String,
}

impl NewMcpServer {
    /// Trim both fields and check them. Name uniqueness is checked by the
    /// database.
    pub fn parse(name: &str, url: &str) -> Result<Self, String> {
        let name = name.trim();
        let url = url.trim();

        if name.is_empty() {
            return Err("Name can't be blank".to_string());
        }
        if url.is_empty() {
            return Err("Url can't be blank".to_string());
        }
        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err("Url must be a valid HTTP or HTTPS URL".to_string());
        }

        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}
