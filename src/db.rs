//! Database module for the chat service
//!
//! Stores one row per session holding the whole turn log as JSON, plus the
//! configured MCP servers.

mod schema;

pub use schema::*;

use crate::conversation::{ConfirmationState, Conversation, Turn};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt message log for session {session_id}: {source}")]
    CorruptMessages {
        session_id: String,
        source: serde_json::Error,
    },
    #[error("Failed to encode messages: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Invalid MCP server: {0}")]
    InvalidServer(String),
    #[error("MCP server not found: {0}")]
    ServerNotFound(i64),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    system_prompt: Arc<str>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P, system_prompt: &str) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, system_prompt)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory(system_prompt: &str) -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, system_prompt)
    }

    fn with_connection(conn: Connection, system_prompt: &str) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            system_prompt: Arc::from(system_prompt),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    // ==================== Conversation Operations ====================

    /// Load the conversation for a session, or a fresh seeded one if none
    /// has been saved yet
    pub fn load_conversation(&self, session_id: &str) -> DbResult<Conversation> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT tool_confirmation_state, messages, created_at, updated_at
                 FROM chats WHERE session_id = ?1",
                params![session_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((confirmation, messages, created_at, updated_at)) = row else {
            return Ok(Conversation::seeded(session_id, &self.system_prompt));
        };

        let turns: Vec<Turn> =
            serde_json::from_str(&messages).map_err(|source| DbError::CorruptMessages {
                session_id: session_id.to_string(),
                source,
            })?;

        Ok(Conversation {
            session_id: session_id.to_string(),
            confirmation_state: ConfirmationState::from_column(confirmation.as_deref()),
            turns,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }

    /// Overwrite the stored conversation with `conversation`
    pub fn save_conversation(&self, conversation: &Conversation) -> DbResult<()> {
        let messages = serde_json::to_string(&conversation.turns)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO chats (session_id, tool_confirmation_state, messages, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(session_id) DO UPDATE SET
                tool_confirmation_state = excluded.tool_confirmation_state,
                messages = excluded.messages,
                updated_at = excluded.updated_at",
            params![
                conversation.session_id,
                conversation.confirmation_state.as_column(),
                messages,
                conversation.created_at.to_rfc3339(),
                now,
            ],
        )?;
        Ok(())
    }

    // ==================== MCP Server Operations ====================

    /// All servers, oldest first
    pub fn list_mcp_servers(&self) -> DbResult<Vec<McpServer>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, url, created_at FROM mcp_servers ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(McpServer {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Validate and insert a server
    pub fn add_mcp_server(&self, name: &str, url: &str) -> DbResult<McpServer> {
        let server = NewMcpServer::parse(name, url).map_err(DbError::InvalidServer)?;
        let conn = self.lock()?;
        let now = Utc::now();

        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM mcp_servers WHERE name = ?1 COLLATE NOCASE)",
            params![server.name],
            |row| row.get(0),
        )?;
        if taken {
            return Err(DbError::InvalidServer("Name has already been taken".to_string()));
        }

        conn.execute(
            "INSERT INTO mcp_servers (name, url, created_at) VALUES (?1, ?2, ?3)",
            params![server.name, server.url, now.to_rfc3339()],
        )?;

        Ok(McpServer {
            id: conn.last_insert_rowid(),
            name: server.name,
            url: server.url,
            created_at: now,
        })
    }

    pub fn delete_mcp_server(&self, id: i64) -> DbResult<()> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM mcp_servers WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::ServerNotFound(id));
        }
        Ok(())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
