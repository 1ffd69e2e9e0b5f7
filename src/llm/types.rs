//! Common types for LLM interactions

use crate::conversation::{ToolCallRequest, Turn};

/// LLM request: the full turn history plus the tools the model may call
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub messages: Vec<Turn>,
    pub tools: Vec<ToolDefinition>,
}

/// Tool definition in function-calling form
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// LLM response: one assistant message
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Usage,
}

#[allow(dead_code)] // Used in tests
impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
