//! Conversation runtime executor

use super::traits::{ConversationStore, LlmClient, ToolExecutor};
use super::RuntimeError;

use crate::conversation::{Conversation, ToolCallRequest, Turn};
use crate::llm::LlmRequest;
use crate::projection::ConversationView;
use crate::state_machine::{transition, ConvState, Effect, Event};
use crate::tools::{ToolError, ToolRegistry, ToolSpec};
use chrono::Utc;
use serde_json::Value;

/// Generic conversation runtime that can work with any storage, LLM, and tool implementations.
///
/// Every action loads the conversation, derives its state, and runs the
/// transition loop to completion. Callers must serialize actions per session.
pub struct ConversationRuntime<S, L, T>
where
    S: ConversationStore,
    L: LlmClient,
    T: ToolExecutor,
{
    storage: S,
    llm_client: L,
    tool_executor: T,
}

impl<S, L, T> ConversationRuntime<S, L, T>
where
    S: ConversationStore,
    L: LlmClient,
    T: ToolExecutor,
{
    pub fn new(storage: S, llm_client: L, tool_executor: T) -> Self {
        Self {
            storage,
            llm_client,
            tool_executor,
        }
    }

    /// Start a session. Nothing is stored until the first message.
    pub async fn new_session(&self) -> Result<ConversationView, RuntimeError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(session_id = %session_id, "New session");
        self.view(&session_id).await
    }

    pub async fn view(&self, session_id: &str) -> Result<ConversationView, RuntimeError> {
        let conversation = self.storage.load(session_id).await?;
        Ok(ConversationView::of(&conversation))
    }

    pub async fn send_message(
        &self,
        session_id: &str,
        text: impl Into<String>,
    ) -> Result<ConversationView, RuntimeError> {
        self.dispatch(session_id, Event::UserMessage { text: text.into() })
            .await
    }

    pub async fn confirm_pending_tool(
        &self,
        session_id: &str,
    ) -> Result<ConversationView, RuntimeError> {
        self.dispatch(session_id, Event::Confirm).await
    }

    pub async fn decline_pending_tool(
        &self,
        session_id: &str,
    ) -> Result<ConversationView, RuntimeError> {
        self.dispatch(session_id, Event::Decline).await
    }

    /// Replace the history with a fresh system turn
    pub async fn reset_session(&self, session_id: &str) -> Result<ConversationView, RuntimeError> {
        let mut conversation = self.storage.load(session_id).await?;
        conversation.reset(self.storage.system_prompt());
        conversation.updated_at = Utc::now();
        self.storage.save(&conversation).await?;
        tracing::info!(session_id = %session_id, "Session reset");
        Ok(ConversationView::of(&conversation))
    }

    /// Every tool the model can currently see
    pub async fn toolbox(&self) -> Vec<ToolSpec> {
        self.tool_executor.list_tools().await
    }

    async fn dispatch(
        &self,
        session_id: &str,
        event: Event,
    ) -> Result<ConversationView, RuntimeError> {
        let mut conversation = self.storage.load(session_id).await?;
        self.run(&mut conversation, event).await?;
        Ok(ConversationView::of(&conversation))
    }

    /// Feed `event` through the state machine, executing effects until no
    /// further events are produced
    async fn run(&self, conversation: &mut Conversation, event: Event) -> Result<(), RuntimeError> {
        let mut state = ConvState::of(conversation);
        let mut next = Some(event);

        while let Some(event) = next.take() {
            let event_name = event.name();
            let result = match transition(&state, event) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(
                        session_id = %conversation.session_id,
                        state = state.as_str(),
                        event = event_name,
                        error = %e,
                        "Ignoring action"
                    );
                    return Ok(());
                }
            };

            tracing::debug!(
                session_id = %conversation.session_id,
                from = state.as_str(),
                to = result.new_state.as_str(),
                event = event_name,
                "Transition"
            );
            state = result.new_state;

            for effect in result.effects {
                if effect.apply(conversation) {
                    continue;
                }
                match effect {
                    Effect::Persist => {
                        conversation.updated_at = Utc::now();
                        self.storage.save(conversation).await?;
                    }
                    Effect::RequestModel => next = Some(self.model_step(conversation).await?),
                    Effect::ExecuteTool { call } => {
                        next = Some(self.execute_tool(&conversation.session_id, &call).await);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// One model call over the full history
    async fn model_step(&self, conversation: &Conversation) -> Result<Event, RuntimeError> {
        let tools = self.tool_executor.list_tools().await;
        let request = LlmRequest {
            messages: conversation.turns.clone(),
            tools: ToolRegistry::to_model_schema(&tools),
        };

        let response = self.llm_client.complete(&request).await.map_err(|e| {
            tracing::error!(
                session_id = %conversation.session_id,
                error = %e,
                "Model step failed"
            );
            RuntimeError::Llm(e)
        })?;

        Ok(Event::ModelReply {
            content: response.content,
            tool_calls: response.tool_calls,
        })
    }

    /// Run the approved call. Failures become the tool turn's content.
    async fn execute_tool(&self, session_id: &str, call: &ToolCallRequest) -> Event {
        let (arguments, outcome) = match call.parsed_arguments() {
            Ok(arguments) => {
                let outcome = self.tool_executor.invoke(call.name(), arguments.clone()).await;
                (arguments, outcome)
            }
            Err(e) => (
                Value::String(call.function.arguments.clone()),
                Err(ToolError::InvalidArguments(e.to_string())),
            ),
        };

        let content = match outcome {
            Ok(result) => {
                tracing::info!(session_id = %session_id, tool = %call.name(), "Tool succeeded");
                result.to_string()
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, tool = %call.name(), error = %e, "Tool failed");
                format!("Error: {e}")
            }
        };

        Event::ToolComplete {
            call_id: call.id.clone(),
            turn: Turn::tool_result(call, arguments, content),
        }
    }
}
