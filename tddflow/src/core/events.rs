//! Host events consumed by the controller and the replies it produces.
//!
//! Each event kind carries only the fields valid for that kind. The serialized
//! form is the line format of the stdio bridge (`type` tag, snake_case).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::FlowError;

/// One event dispatched by the host runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// The agent is about to run a tool; the reply may veto it.
    ToolCall(ToolCall),
    /// A tool finished executing.
    #[serde(alias = "tool_execution_end")]
    ToolResult(ToolResult),
    /// The agent finished its turn.
    #[serde(alias = "agent_end")]
    TurnEnd(TurnEnd),
    /// The user invoked one of the registered commands.
    Command { name: String },
    /// The agent invoked one of the registered tools.
    Tool {
        name: String,
        #[serde(default)]
        params: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub input: Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, input: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
        }
    }

    /// First string-valued input field among `keys`.
    pub fn target_path(&self, keys: &[String]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.input.get(key.as_str()).and_then(Value::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnEnd {
    /// Final assistant text of the turn, if the host forwards it.
    #[serde(default)]
    pub last_message: Option<String>,
}

/// Verdict on an intercepted tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ToolDecision {
    Allow,
    Block { reason: String },
}

impl ToolDecision {
    pub fn block(reason: impl Into<String>) -> Self {
        ToolDecision::Block {
            reason: reason.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, ToolDecision::Block { .. })
    }
}

/// Text returned from an agent tool, always prefixed `SUCCESS:` or `FAILED:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum ToolResponse {
    Success(String),
    Failed(String),
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        ToolResponse::Success(text.into())
    }

    pub fn failed(text: impl Into<String>) -> Self {
        ToolResponse::Failed(text.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResponse::Success(_))
    }

    /// The single text block handed back to the agent.
    pub fn render(&self) -> String {
        match self {
            ToolResponse::Success(text) => format!("SUCCESS: {}", text.trim()),
            ToolResponse::Failed(text) => format!("FAILED: {}", text.trim()),
        }
    }
}

impl From<FlowError> for ToolResponse {
    fn from(err: FlowError) -> Self {
        ToolResponse::Failed(err.to_string())
    }
}

/// Reply to a single [`HostEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventReply {
    Decision(ToolDecision),
    ToolResponse { text: String, success: bool },
    Ack,
}

impl From<ToolResponse> for EventReply {
    fn from(response: ToolResponse) -> Self {
        EventReply::ToolResponse {
            success: response.is_success(),
            text: response.render(),
        }
    }
}
