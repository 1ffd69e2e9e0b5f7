//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use crate::tools::{ToolError, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
#[allow(dead_code)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// Mock tool executor with predefined outcomes
#[allow(dead_code)]
pub struct MockToolExecutor {
    tools: Vec<ToolSpec>,
    outcomes: HashMap<String, Result<Value, ToolError>>,
    /// Record of tool invocations
    pub invocations: Mutex<Vec<(String, Value)>>,
}

#[allow(dead_code)]
impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            outcomes: HashMap::new(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Add a tool that always produces `outcome`
    pub fn with_tool(mut self, name: impl Into<String>, outcome: Result<Value, ToolError>) -> Self {
        let name = name.into();
        self.tools.push(ToolSpec {
            name: name.clone(),
            description: format!("Mock {name}"),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        });
        self.outcomes.insert(name, outcome);
        self
    }

    /// Get recorded invocations
    pub fn recorded_invocations(&self) -> Vec<(String, Value)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn list_tools(&self) -> Vec<ToolSpec> {
        self.tools.clone()
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        self.invocations
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        self.outcomes
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(ToolError::NotFound(name.to_string())))
    }
}

// ============================================================================
// Scenario tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConfirmationState, ToolCallRequest, Turn};
    use crate::db::Database;
    use crate::projection::DisplayRole;
    use crate::runtime::{ConversationRuntime, RuntimeError};
    use serde_json::json;
    use std::sync::Arc;

    const PROMPT: &str = "You are a helpful assistant";

    struct Harness {
        db: Database,
        llm: Arc<MockLlmClient>,
        tools: Arc<MockToolExecutor>,
        runtime: ConversationRuntime<DatabaseStorage, Arc<MockLlmClient>, Arc<MockToolExecutor>>,
    }

    fn harness(tools: MockToolExecutor) -> Harness {
        let db = Database::open_in_memory(PROMPT).unwrap();
        let llm = Arc::new(MockLlmClient::new("mock"));
        let tools = Arc::new(tools);
        let runtime = ConversationRuntime::new(
            DatabaseStorage::new(db.clone()),
            llm.clone(),
            tools.clone(),
        );
        Harness {
            db,
            llm,
            tools,
            runtime,
        }
    }

    fn post_tools(outcome: Result<Value, ToolError>) -> MockToolExecutor {
        MockToolExecutor::new().with_tool("post-update-tool", outcome)
    }

    fn update_call() -> ToolCallRequest {
        ToolCallRequest::new(
            "call_1",
            "post-update-tool",
            r#"{"id":5,"title":"Hello world"}"#,
        )
    }

    #[tokio::test]
    async fn test_plain_reply() {
        let h = harness(MockToolExecutor::new());
        h.llm.queue_response(LlmResponse::text("Sure, where to?"));

        let view = h
            .runtime
            .send_message("s1", "Book me a romantic trip")
            .await
            .unwrap();

        assert_eq!(view.state, "idle");
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].role, DisplayRole::User);
        assert_eq!(view.messages[0].content, "Book me a romantic trip");
        assert_eq!(view.messages[1].role, DisplayRole::Assistant);
        assert_eq!(view.messages[1].content, "Sure, where to?");
        assert!(view.messages.iter().all(|m| m.role != DisplayRole::Tool));

        let requests = h.llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].messages,
            vec![Turn::system(PROMPT), Turn::user("Book me a romantic trip")]
        );
    }

    #[tokio::test]
    async fn test_confirm_runs_tool_and_continues() {
        let h = harness(post_tools(Ok(json!({"status": "ok"}))));
        h.llm
            .queue_response(LlmResponse::with_tool_calls(vec![update_call()]));

        let view = h.runtime.send_message("s1", "Update post 5").await.unwrap();
        assert_eq!(view.state, "awaiting_confirmation");
        assert_eq!(view.pending_tool.as_ref().unwrap().name, "post-update-tool");
        assert!(h.tools.recorded_invocations().is_empty());

        h.llm.queue_response(LlmResponse::text("Post 5 is updated."));
        let view = h.runtime.confirm_pending_tool("s1").await.unwrap();

        assert_eq!(view.state, "idle");
        let tail: Vec<_> = view.messages.iter().rev().take(2).collect();
        assert_eq!(tail[0].role, DisplayRole::Assistant);
        assert_eq!(tail[0].content, "Post 5 is updated.");
        assert_eq!(tail[1].role, DisplayRole::Tool);
        assert!(tail[1].content.starts_with("Calling tool post-update-tool"));

        assert_eq!(
            h.tools.recorded_invocations(),
            vec![(
                "post-update-tool".to_string(),
                json!({"id": 5, "title": "Hello world"})
            )]
        );

        let stored = h.db.load_conversation("s1").unwrap();
        assert_eq!(stored.confirmation_state, ConfirmationState::None);
        match &stored.turns[3] {
            Turn::Tool {
                tool_call_id,
                content,
                ..
            } => {
                assert_eq!(tool_call_id, "call_1");
                assert_eq!(content, r#"{"status":"ok"}"#);
            }
            other => panic!("expected tool turn, got {other:?}"),
        }

        // the follow-up model step saw the tool result
        let requests = h.llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(requests[1].messages.last(), Some(Turn::Tool { .. })));
    }

    #[tokio::test]
    async fn test_chained_tool_calls_each_need_confirmation() {
        let h = harness(
            post_tools(Ok(json!({"status": "ok"})))
                .with_tool("post-list-tool", Ok(json!([{"id": 5}]))),
        );
        let list_call = ToolCallRequest::new("call_2", "post-list-tool", "{}");
        h.llm
            .queue_response(LlmResponse::with_tool_calls(vec![update_call()]));
        h.runtime.send_message("s1", "Update post 5").await.unwrap();

        h.llm
            .queue_response(LlmResponse::with_tool_calls(vec![list_call.clone()]));
        let view = h.runtime.confirm_pending_tool("s1").await.unwrap();

        assert_eq!(view.state, "awaiting_confirmation");
        let pending = view.pending_tool.as_ref().unwrap();
        assert_eq!(pending.name, "post-list-tool");
        assert_eq!(h.tools.recorded_invocations().len(), 1);
        let stored = h.db.load_conversation("s1").unwrap();
        assert_eq!(stored.confirmation_state, ConfirmationState::None);
        assert_eq!(stored.pending_tool_call(), Some(&list_call));

        h.llm.queue_response(LlmResponse::text("Post 5 is updated and listed."));
        let view = h.runtime.confirm_pending_tool("s1").await.unwrap();

        assert_eq!(view.state, "idle");
        assert!(view.pending_tool.is_none());
        let names: Vec<_> = h
            .tools
            .recorded_invocations()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["post-update-tool", "post-list-tool"]);

        let stored = h.db.load_conversation("s1").unwrap();
        let roles: Vec<_> = stored.turns.iter().map(Turn::role).collect();
        assert_eq!(
            roles,
            vec!["system", "user", "assistant", "tool", "assistant", "tool", "assistant"]
        );
        assert_eq!(h.llm.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_decline_repairs_history() {
        let h = harness(post_tools(Ok(json!({"status": "ok"}))));
        h.llm
            .queue_response(LlmResponse::with_tool_calls(vec![update_call()]));
        h.runtime.send_message("s1", "Update post 5").await.unwrap();
        let before = h.db.load_conversation("s1").unwrap().turns.len();

        let view = h.runtime.decline_pending_tool("s1").await.unwrap();

        assert_eq!(view.state, "idle");
        assert!(view.messages.iter().all(|m| m.role != DisplayRole::Tool));
        let stored = h.db.load_conversation("s1").unwrap();
        assert_eq!(stored.turns.len(), before);
        assert_eq!(
            stored.turns.last(),
            Some(&Turn::user("I decline the tool call: post-update-tool"))
        );
        assert!(stored.turns.iter().all(|t| !t.has_tool_calls()));
        assert!(h.tools.recorded_invocations().is_empty());
        assert_eq!(h.llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_raising_tool_becomes_error_turn() {
        let h = harness(post_tools(Err(ToolError::Provider("Post not found".into()))));
        h.llm
            .queue_response(LlmResponse::with_tool_calls(vec![update_call()]));
        h.runtime.send_message("s1", "Update post 5").await.unwrap();

        h.llm
            .queue_response(LlmResponse::text("That post does not exist."));
        let view = h.runtime.confirm_pending_tool("s1").await.unwrap();

        assert_eq!(view.state, "idle");
        let stored = h.db.load_conversation("s1").unwrap();
        assert_eq!(stored.confirmation_state, ConfirmationState::None);
        match &stored.turns[3] {
            Turn::Tool { content, .. } => assert_eq!(content, "Error: Tool failed: Post not found"),
            other => panic!("expected tool turn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_arguments_are_a_tool_error() {
        let h = harness(post_tools(Ok(json!({"status": "ok"}))));
        h.llm.queue_response(LlmResponse::with_tool_calls(vec![
            ToolCallRequest::new("call_1", "post-update-tool", "{id: 5"),
        ]));
        h.runtime.send_message("s1", "Update post 5").await.unwrap();

        h.llm.queue_response(LlmResponse::text("Let me try again."));
        h.runtime.confirm_pending_tool("s1").await.unwrap();

        assert!(h.tools.recorded_invocations().is_empty());
        let stored = h.db.load_conversation("s1").unwrap();
        match &stored.turns[3] {
            Turn::Tool {
                content, arguments, ..
            } => {
                assert!(content.starts_with("Error: Invalid tool arguments"));
                assert_eq!(arguments, &json!("{id: 5"));
            }
            other => panic!("expected tool turn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_confirm_is_noop() {
        let h = harness(post_tools(Ok(json!({"status": "ok"}))));
        h.llm
            .queue_response(LlmResponse::with_tool_calls(vec![update_call()]));
        h.runtime.send_message("s1", "Update post 5").await.unwrap();
        h.llm.queue_response(LlmResponse::text("Done."));
        let first = h.runtime.confirm_pending_tool("s1").await.unwrap();

        let second = h.runtime.confirm_pending_tool("s1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.tools.recorded_invocations().len(), 1);
        assert_eq!(h.llm.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_model_step_keeps_saved_turns() {
        let h = harness(MockToolExecutor::new());
        h.llm.queue_error(LlmError::network("connection reset"));

        let err = h.runtime.send_message("s1", "hello").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Llm(_)));

        let stored = h.db.load_conversation("s1").unwrap();
        assert_eq!(stored.turns, vec![Turn::system(PROMPT), Turn::user("hello")]);

        // retrying is safe
        h.llm.queue_response(LlmResponse::text("Hi!"));
        let view = h.runtime.send_message("s1", "hello").await.unwrap();
        assert_eq!(view.state, "idle");
        assert_eq!(view.messages.last().unwrap().content, "Hi!");
    }

    #[tokio::test]
    async fn test_only_first_requested_call_is_kept() {
        let h = harness(post_tools(Ok(json!({"status": "ok"}))));
        h.llm.queue_response(LlmResponse::with_tool_calls(vec![
            update_call(),
            ToolCallRequest::new("call_2", "post-update-tool", r#"{"id":6}"#),
            ToolCallRequest::new("call_3", "post-update-tool", r#"{"id":7}"#),
        ]));

        let view = h.runtime.send_message("s1", "Update posts").await.unwrap();

        assert_eq!(view.pending_tool.unwrap().id, "call_1");
        let stored = h.db.load_conversation("s1").unwrap();
        assert_eq!(stored.turns.last().unwrap().tool_calls(), &[update_call()]);
    }

    #[tokio::test]
    async fn test_message_while_confirmation_pending_is_ignored() {
        let h = harness(post_tools(Ok(json!({"status": "ok"}))));
        h.llm
            .queue_response(LlmResponse::with_tool_calls(vec![update_call()]));
        let pending = h.runtime.send_message("s1", "Update post 5").await.unwrap();

        let view = h.runtime.send_message("s1", "never mind").await.unwrap();

        assert_eq!(view, pending);
        assert_eq!(h.llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_message_in_approved_resumes_call() {
        let h = harness(post_tools(Ok(json!({"status": "ok"}))));
        let mut conv = h.db.load_conversation("s1").unwrap();
        conv.push(Turn::user("Update post 5"));
        conv.push(Turn::pending_call(update_call()));
        conv.confirmation_state = ConfirmationState::Approved;
        h.db.save_conversation(&conv).unwrap();

        h.llm.queue_response(LlmResponse::text("Done."));
        let view = h.runtime.send_message("s1", "are you there?").await.unwrap();

        assert_eq!(view.state, "idle");
        assert_eq!(h.tools.recorded_invocations().len(), 1);
        let stored = h.db.load_conversation("s1").unwrap();
        assert!(stored
            .turns
            .iter()
            .all(|t| t != &Turn::user("are you there?")));
    }

    #[tokio::test]
    async fn test_model_sees_tool_schemas() {
        let h = harness(post_tools(Ok(json!({}))));
        h.llm.queue_response(LlmResponse::text("ok"));
        h.runtime.send_message("s1", "hi").await.unwrap();

        let requests = h.llm.recorded_requests();
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tools[0].name, "post-update-tool");
    }

    #[tokio::test]
    async fn test_reset_and_new_session() {
        let h = harness(MockToolExecutor::new());
        h.llm.queue_response(LlmResponse::text("Hi"));
        h.runtime.send_message("s1", "hello").await.unwrap();

        let view = h.runtime.reset_session("s1").await.unwrap();
        assert!(view.messages.is_empty());
        assert_eq!(
            h.db.load_conversation("s1").unwrap().turns,
            vec![Turn::system(PROMPT)]
        );

        let fresh = h.runtime.new_session().await.unwrap();
        assert_ne!(fresh.session_id, "s1");
        assert!(fresh.messages.is_empty());
        assert_eq!(fresh.state, "idle");
    }
}
