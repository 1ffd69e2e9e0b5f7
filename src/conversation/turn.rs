//! Conversation turns and tool-call requests
//!
//! The persisted JSON shape of a turn is
//! `{role, content?, tool_calls?: [{id, type, function:{name, arguments}}], tool_call_id?, name?, arguments?}`
//! and is also what the model step reads back as history.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn function_kind() -> String {
    "function".to_string()
}

/// Name and raw argument text of a requested function call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Unparsed JSON text exactly as issued by the model
    pub arguments: String,
}

/// A tool-call request issued by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Opaque correlation token issued by the model
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Parse the argument text into structured JSON.
    ///
    /// Models occasionally send an empty string for zero-argument tools; that
    /// is treated as an empty object.
    pub fn parsed_arguments(&self) -> Result<Value, serde_json::Error> {
        let raw = self.function.arguments.trim();
        if raw.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(raw)
    }
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        #[serde(alias = "function_name")]
        name: String,
        #[serde(default, alias = "function_arguments")]
        arguments: Value,
        content: String,
    },
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Turn::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    /// A final assistant reply with no tool call
    pub fn assistant_reply(content: Option<String>) -> Self {
        Turn::Assistant {
            content,
            tool_calls: Vec::new(),
        }
    }

    /// An assistant turn holding exactly one pending tool call
    pub fn pending_call(call: ToolCallRequest) -> Self {
        Turn::Assistant {
            content: None,
            tool_calls: vec![call],
        }
    }

    /// The result of executing `call`
    pub fn tool_result(call: &ToolCallRequest, arguments: Value, content: impl Into<String>) -> Self {
        Turn::Tool {
            tool_call_id: call.id.clone(),
            name: call.name().to_string(),
            arguments,
            content: content.into(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Turn::System { .. } => "system",
            Turn::User { .. } => "user",
            Turn::Assistant { .. } => "assistant",
            Turn::Tool { .. } => "tool",
        }
    }

    /// Tool-call requests carried by an assistant turn
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Turn::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }
}
