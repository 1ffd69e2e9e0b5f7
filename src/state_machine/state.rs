//! Conversation state types

use crate::conversation::{ConfirmationState, Conversation, ToolCallRequest};

/// Orchestration state of one conversation.
///
/// Derived from the stored conversation on every request (see [`ConvState::of`]),
/// except `AwaitingModel`, which only exists while a model step is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConvState {
    /// No pending tool call
    #[default]
    Idle,

    /// A user or tool turn was persisted and the model has not replied yet
    AwaitingModel,

    /// The model requested `call` and the user has not decided
    AwaitingConfirmation { call: ToolCallRequest },

    /// The user approved `call`; it has not produced a tool turn yet
    Approved { call: ToolCallRequest },
}

impl ConvState {
    /// Derive the state from the last turn and the confirmation flag
    pub fn of(conversation: &Conversation) -> Self {
        match conversation.pending_tool_call() {
            None => ConvState::Idle,
            Some(call) => match conversation.confirmation_state {
                ConfirmationState::None => ConvState::AwaitingConfirmation { call: call.clone() },
                ConfirmationState::Approved => ConvState::Approved { call: call.clone() },
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::AwaitingModel => "awaiting_model",
            ConvState::AwaitingConfirmation { .. } => "awaiting_confirmation",
            ConvState::Approved { .. } => "approved",
        }
    }

    pub fn pending_call(&self) -> Option<&ToolCallRequest> {
        match self {
            ConvState::AwaitingConfirmation { call } | ConvState::Approved { call } => Some(call),
            ConvState::Idle | ConvState::AwaitingModel => None,
        }
    }
}
