//! Read-only, user-facing view of a conversation log

use crate::conversation::{Conversation, ToolCallRequest, Turn};
use crate::state_machine::ConvState;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayRole {
    User,
    Assistant,
    Tool,
}

/// One rendered turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTurn {
    pub role: DisplayRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRequest>,
}

impl DisplayTurn {
    fn text(role: DisplayRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call: None,
        }
    }
}

/// The call awaiting a decision, with its arguments parsed when possible
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingToolView {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl PendingToolView {
    fn of(call: &ToolCallRequest) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name().to_string(),
            arguments: call
                .parsed_arguments()
                .unwrap_or_else(|_| Value::String(call.function.arguments.clone())),
        }
    }
}

/// Everything the UI needs to render a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub session_id: String,
    pub state: &'static str,
    pub messages: Vec<DisplayTurn>,
    pub pending_tool: Option<PendingToolView>,
}

impl ConversationView {
    pub fn of(conversation: &Conversation) -> Self {
        let state = ConvState::of(conversation);
        Self {
            session_id: conversation.session_id.clone(),
            state: state.as_str(),
            messages: project(conversation),
            pending_tool: state.pending_call().map(PendingToolView::of),
        }
    }
}

/// Render the log for display.
///
/// System turns and empty assistant replies are hidden; tool traffic is
/// summarized instead of shown as raw JSON.
pub fn project(conversation: &Conversation) -> Vec<DisplayTurn> {
    conversation.turns.iter().filter_map(display).collect()
}

fn display(turn: &Turn) -> Option<DisplayTurn> {
    match turn {
        Turn::System { .. } => None,
        Turn::User { content } => Some(DisplayTurn::text(DisplayRole::User, content.clone())),
        Turn::Assistant {
            content,
            tool_calls,
        } => match tool_calls.first() {
            Some(call) => Some(DisplayTurn {
                role: DisplayRole::Assistant,
                content: format!("Requesting tool {}", call.name()),
                tool_call: Some(call.clone()),
            }),
            None => content
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| DisplayTurn::text(DisplayRole::Assistant, c)),
        },
        Turn::Tool {
            name, arguments, ..
        } => Some(DisplayTurn::text(
            DisplayRole::Tool,
            tool_summary(name, arguments),
        )),
    }
}

/// "Calling tool <name>" plus one indented `key => value` line per argument
fn tool_summary(name: &str, arguments: &Value) -> String {
    let mut summary = format!("Calling tool {name}");
    match arguments {
        Value::Object(map) => {
            for (key, value) in map {
                summary.push_str(&format!("\n  {key} => {}", plain(value)));
            }
        }
        Value::Null => {}
        other => summary.push_str(&format!("\n  {}", plain(other))),
    }
    summary
}

/// Strings without their JSON quotes, everything else as compact JSON
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
