//! Events that can occur in a conversation

use crate::conversation::{ToolCallRequest, Turn};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    Confirm,
    Decline,

    // Model events
    ModelReply {
        content: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    },

    // Tool events
    ToolComplete {
        call_id: String,
        /// The `Tool` turn recording the outcome
        turn: Turn,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user_message",
            Event::Confirm => "confirm",
            Event::Decline => "decline",
            Event::ModelReply { .. } => "model_reply",
            Event::ToolComplete { .. } => "tool_complete",
        }
    }
}
