//! Property-based tests for the state machine
//!
//! Drive random event sequences through `transition`, applying the
//! conversation effects the way the runtime does, and check the invariants
//! after every step.

use super::transition::*;
use super::*;
use crate::conversation::{ConfirmationState, Conversation, ToolCallRequest, Turn};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_call() -> impl Strategy<Value = ToolCallRequest> {
    ("call_[a-z0-9]{6}", "[a-z]{3,8}-tool", "[a-z0-9{}\":, ]{0,20}")
        .prop_map(|(id, name, args)| ToolCallRequest::new(id, name, args))
}

fn arb_model_reply() -> impl Strategy<Value = Event> {
    (
        proptest::option::of("[a-zA-Z ]{0,30}"),
        prop::collection::vec(arb_tool_call(), 0..4),
    )
        .prop_map(|(content, tool_calls)| Event::ModelReply {
            content,
            tool_calls,
        })
}

/// What the user (or a stale client) asks for next
#[derive(Debug, Clone)]
enum Action {
    Message(String),
    Confirm,
    Decline,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        "[a-zA-Z ]{1,20}".prop_map(Action::Message),
        Just(Action::Confirm),
        Just(Action::Decline),
    ]
}

// ============================================================================
// Harness
// ============================================================================

/// Apply effects in order; returns the I/O effects left for the runtime
fn apply_all(conv: &mut Conversation, effects: &[Effect]) -> Vec<Effect> {
    effects
        .iter()
        .filter(|e| !e.apply(conv))
        .cloned()
        .collect()
}

fn check_invariants(conv: &Conversation) -> Result<(), TestCaseError> {
    for (i, turn) in conv.turns.iter().enumerate() {
        prop_assert!(
            turn.tool_calls().len() <= 1,
            "assistant turn {} holds {} calls",
            i,
            turn.tool_calls().len()
        );
        if let Turn::Tool { tool_call_id, .. } = turn {
            let prev = i.checked_sub(1).map(|p| &conv.turns[p]);
            let matches = prev.is_some_and(|p| {
                p.tool_calls().first().is_some_and(|c| &c.id == tool_call_id)
            });
            prop_assert!(matches, "tool turn {} does not follow its call", i);
        }
    }
    let first_is_system = matches!(conv.turns.first(), Some(Turn::System { .. }));
    prop_assert!(first_is_system, "first turn is not the system turn");
    Ok(())
}

/// Run one user action to completion, answering model requests from `replies`
fn drive(
    conv: &mut Conversation,
    action: Action,
    replies: &mut impl Iterator<Item = Event>,
) -> Result<(), TestCaseError> {
    let event = match action {
        Action::Message(text) => Event::UserMessage { text },
        Action::Confirm => Event::Confirm,
        Action::Decline => Event::Decline,
    };

    let mut state = ConvState::of(conv);
    let mut pending = vec![event];
    while let Some(event) = pending.pop() {
        let Ok(result) = transition(&state, event) else {
            // invalid transitions never touch the conversation
            prop_assert_eq!(ConvState::of(conv), state.clone());
            return Ok(());
        };

        let io = apply_all(conv, &result.effects);
        state = result.new_state;

        // stored state agrees with the transition, except while a model step is due
        if state == ConvState::AwaitingModel {
            prop_assert_eq!(ConvState::of(conv), ConvState::Idle);
        } else {
            prop_assert_eq!(ConvState::of(conv), state.clone());
        }
        check_invariants(conv)?;

        for effect in io {
            match effect {
                Effect::RequestModel => match replies.next() {
                    Some(reply) => pending.push(reply),
                    None => return Ok(()),
                },
                Effect::ExecuteTool { call } => {
                    let turn = Turn::tool_result(&call, json!({}), "{\"ok\":true}");
                    pending.push(Event::ToolComplete {
                        call_id: call.id.clone(),
                        turn,
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_invariants_hold_over_random_sessions(
        actions in prop::collection::vec(arb_action(), 1..12),
        replies in prop::collection::vec(arb_model_reply(), 0..24),
    ) {
        let mut conv = Conversation::seeded("prop", "You are a helpful assistant");
        let mut replies = replies.into_iter();
        for action in actions {
            drive(&mut conv, action, &mut replies)?;
        }
    }

    #[test]
    fn prop_model_reply_stores_at_most_one_call(reply in arb_model_reply()) {
        let result = transition(&ConvState::AwaitingModel, reply).unwrap();
        for effect in &result.effects {
            if let Effect::AppendTurn(turn) = effect {
                prop_assert!(turn.tool_calls().len() <= 1);
            }
        }
    }

    #[test]
    fn prop_decline_keeps_log_length(
        history in prop::collection::vec("[a-z ]{1,10}", 0..5),
        call in arb_tool_call(),
    ) {
        let mut conv = Conversation::seeded("prop", "sys");
        for text in history {
            conv.push(Turn::user(text.clone()));
            conv.push(Turn::assistant_reply(Some(text)));
        }
        conv.push(Turn::user("do it"));
        conv.push(Turn::pending_call(call.clone()));
        let before = conv.turns.clone();

        let result = transition(&ConvState::of(&conv), Event::Decline).unwrap();
        apply_all(&mut conv, &result.effects);

        prop_assert_eq!(conv.turns.len(), before.len());
        prop_assert_eq!(&conv.turns[..before.len() - 1], &before[..before.len() - 1]);
        prop_assert_eq!(
            conv.turns.last(),
            Some(&Turn::user(decline_notice(call.name())))
        );
        prop_assert_eq!(conv.confirmation_state, ConfirmationState::None);
    }

    #[test]
    fn prop_stale_confirm_changes_nothing(actions in prop::collection::vec(arb_action(), 0..6)) {
        let mut conv = Conversation::seeded("prop", "sys");
        let mut replies = std::iter::repeat_with(|| Event::ModelReply {
            content: Some("done".to_string()),
            tool_calls: vec![],
        });
        for action in actions {
            drive(&mut conv, action, &mut replies)?;
        }

        // without tool calls nothing is ever pending
        prop_assert_eq!(ConvState::of(&conv), ConvState::Idle);
        prop_assert!(transition(&ConvState::of(&conv), Event::Confirm).is_err());
    }
}
