//! Effects produced by state transitions

use crate::conversation::{repair, ConfirmationState, Conversation, ToolCallRequest, Turn};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a turn to the log
    AppendTurn(Turn),

    /// Rewrite the last turn to hold only the confirmed call
    PinPendingCall(ToolCallRequest),

    /// Remove the declined assistant turn (second to last)
    RepairDeclined,

    SetConfirmation(ConfirmationState),

    /// Save the whole conversation
    Persist,

    /// Run a model step over the full history
    RequestModel,

    /// Invoke the tool and report back with `ToolComplete`
    ExecuteTool { call: ToolCallRequest },
}

impl Effect {
    pub fn append(turn: Turn) -> Self {
        Effect::AppendTurn(turn)
    }

    pub fn execute_tool(call: ToolCallRequest) -> Self {
        Effect::ExecuteTool { call }
    }

    /// Apply an in-memory mutation to the conversation.
    ///
    /// Returns `false` for effects that need I/O (`Persist`, `RequestModel`,
    /// `ExecuteTool`); the runtime handles those.
    pub fn apply(&self, conversation: &mut Conversation) -> bool {
        match self {
            Effect::AppendTurn(turn) => conversation.push(turn.clone()),
            Effect::PinPendingCall(call) => conversation.pin_pending_call(call),
            Effect::SetConfirmation(state) => conversation.confirmation_state = *state,
            Effect::RepairDeclined => match repair(&conversation.turns) {
                Ok(turns) => conversation.turns = turns,
                Err(e) => {
                    tracing::warn!(
                        session_id = %conversation.session_id,
                        error = %e,
                        "Skipping history repair"
                    );
                }
            },
            Effect::Persist | Effect::RequestModel | Effect::ExecuteTool { .. } => return false,
        }
        true
    }
}
