//! Conversation entity: the ordered turn log plus confirmation state for one session

mod turn;

pub use turn::{FunctionCall, ToolCallRequest, Turn};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether the user has approved the pending tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    #[default]
    None,
    Approved,
}

impl ConfirmationState {
    /// Column value in the `chats` table (NULL when not approved)
    pub fn as_column(self) -> Option<&'static str> {
        match self {
            ConfirmationState::None => None,
            ConfirmationState::Approved => Some("YES"),
        }
    }

    pub fn from_column(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("yes") => ConfirmationState::Approved,
            _ => ConfirmationState::None,
        }
    }
}

/// Full history and confirmation state for one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub session_id: String,
    pub confirmation_state: ConfirmationState,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// A fresh conversation seeded with a single system turn
    pub fn seeded(session_id: impl Into<String>, system_prompt: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            confirmation_state: ConfirmationState::None,
            turns: vec![Turn::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The tool call awaiting a decision, if the last turn is an assistant
    /// turn carrying one
    pub fn pending_tool_call(&self) -> Option<&ToolCallRequest> {
        match self.last_turn() {
            Some(turn @ Turn::Assistant { .. }) => turn.tool_calls().first(),
            _ => None,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop every turn except a fresh system turn and clear the approval
    pub fn reset(&mut self, system_prompt: &str) {
        self.turns = vec![Turn::system(system_prompt)];
        self.confirmation_state = ConfirmationState::None;
    }

    /// Rewrite the last turn so it holds only `call`.
    ///
    /// No-op unless the last turn is an assistant turn with tool calls.
    pub fn pin_pending_call(&mut self, call: &ToolCallRequest) {
        if let Some(last) = self.turns.last_mut() {
            if last.has_tool_calls() {
                *last = Turn::pending_call(call.clone());
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepairError {
    #[error("history too short to repair ({0} turns)")]
    TooShort(usize),
    #[error("expected an assistant turn with a tool call before the last turn, found {0}")]
    UnexpectedTurn(&'static str),
}

/// Remove the declined assistant tool-call turn from history.
///
/// Precondition: the second-to-last turn is an assistant turn carrying tool
/// calls (the last turn being the decline notice). Returns a new list with
/// exactly that turn removed.
pub fn repair(turns: &[Turn]) -> Result<Vec<Turn>, RepairError> {
    let Some(index) = turns.len().checked_sub(2) else {
        return Err(RepairError::TooShort(turns.len()));
    };
    let candidate = &turns[index];
    if !matches!(candidate, Turn::Assistant { .. }) || !candidate.has_tool_calls() {
        return Err(RepairError::UnexpectedTurn(candidate.role()));
    }

    let mut repaired = Vec::with_capacity(turns.len() - 1);
    repaired.extend_from_slice(&turns[..index]);
    repaired.extend_from_slice(&turns[index + 1..]);
    Ok(repaired)
}
