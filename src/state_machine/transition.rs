//! Pure state transition function

use super::{ConvState, Effect, Event};
use crate::conversation::{ConfirmationState, Turn};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A tool call is awaiting confirmation")]
    ConfirmationPending,
    #[error("No tool call is awaiting confirmation")]
    NothingToConfirm,
    #[error("Tool result {0} does not match the approved call")]
    UnexpectedToolResult(String),
    #[error("Invalid transition: {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Text of the user turn recorded when a call is declined
pub fn decline_notice(tool_name: &str) -> String {
    format!("I decline the tool call: {tool_name}")
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// expressed as effects for the runtime to carry out.
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User messages
        // ============================================================

        // Idle + UserMessage -> AwaitingModel
        (ConvState::Idle, Event::UserMessage { text }) => {
            Ok(TransitionResult::new(ConvState::AwaitingModel).with_effects([
                Effect::append(Turn::user(text)),
                Effect::Persist,
                Effect::RequestModel,
            ]))
        }

        // Approved + UserMessage -> resume the approved call; the text is not recorded
        (ConvState::Approved { call }, Event::UserMessage { .. }) => {
            Ok(TransitionResult::new(ConvState::Approved { call: call.clone() }).with_effects([
                Effect::PinPendingCall(call.clone()),
                Effect::Persist,
                Effect::execute_tool(call.clone()),
            ]))
        }

        (ConvState::AwaitingConfirmation { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::ConfirmationPending)
        }

        // ============================================================
        // Model step
        // ============================================================

        // AwaitingModel + ModelReply with calls -> AwaitingConfirmation (first call only)
        (ConvState::AwaitingModel, Event::ModelReply { content, tool_calls }) => {
            let mut calls = tool_calls.into_iter();
            match calls.next() {
                Some(first) => {
                    let dropped = calls.count();
                    if dropped > 0 {
                        tracing::debug!(
                            kept = %first.function.name,
                            dropped,
                            "Keeping only the first requested tool call"
                        );
                    }
                    Ok(
                        TransitionResult::new(ConvState::AwaitingConfirmation {
                            call: first.clone(),
                        })
                        .with_effects([Effect::append(Turn::pending_call(first)), Effect::Persist]),
                    )
                }
                // AwaitingModel + final reply -> Idle
                None => Ok(TransitionResult::new(ConvState::Idle).with_effects([
                    Effect::append(Turn::assistant_reply(content)),
                    Effect::Persist,
                ])),
            }
        }

        // ============================================================
        // Confirmation
        // ============================================================

        // AwaitingConfirmation + Confirm -> Approved, execute
        (ConvState::AwaitingConfirmation { call }, Event::Confirm) => {
            Ok(TransitionResult::new(ConvState::Approved { call: call.clone() }).with_effects([
                Effect::SetConfirmation(ConfirmationState::Approved),
                Effect::PinPendingCall(call.clone()),
                Effect::Persist,
                Effect::execute_tool(call.clone()),
            ]))
        }

        // AwaitingConfirmation + Decline -> Idle, history repaired
        (ConvState::AwaitingConfirmation { call }, Event::Decline) => {
            Ok(TransitionResult::new(ConvState::Idle).with_effects([
                Effect::append(Turn::user(decline_notice(call.name()))),
                Effect::SetConfirmation(ConfirmationState::None),
                Effect::RepairDeclined,
                Effect::Persist,
            ]))
        }

        (ConvState::Idle | ConvState::AwaitingModel, Event::Confirm | Event::Decline) => {
            Err(TransitionError::NothingToConfirm)
        }

        // ============================================================
        // Tool completion
        // ============================================================

        // Approved + ToolComplete -> AwaitingModel
        (ConvState::Approved { call }, Event::ToolComplete { call_id, turn }) => {
            if call_id != call.id || !matches!(turn, Turn::Tool { .. }) {
                return Err(TransitionError::UnexpectedToolResult(call_id));
            }
            Ok(TransitionResult::new(ConvState::AwaitingModel).with_effects([
                Effect::append(turn),
                Effect::SetConfirmation(ConfirmationState::None),
                Effect::Persist,
                Effect::RequestModel,
            ]))
        }

        // ============================================================
        // Everything else
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition {
            state: state.as_str(),
            event: event.name(),
        }),
    }
}
