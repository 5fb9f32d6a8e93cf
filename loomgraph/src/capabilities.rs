//! The two external collaborators the core consumes through capability
//! interfaces: an LLM provider and a tool runtime.
//!
//! Neither is implemented here — the core only defines the seam that the
//! Agent and Tool vertices call through, using the crate's usual
//! `thiserror`+`miette::Diagnostic` error style.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One turn in an LLM conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    /// Tool calls the assistant requested in this turn, if any.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Set on a `tool`-role turn to correlate it with the call it answers.
    pub tool_call_id: Option<String>,
}

impl ConversationTurn {
    pub const SYSTEM: &'static str = "system";
    pub const USER: &'static str = "user";
    pub const ASSISTANT: &'static str = "assistant";
    pub const TOOL: &'static str = "tool";

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Self::USER, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    #[must_use]
    pub fn tool_result(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Self::TOOL.to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    #[must_use]
    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = calls;
        self
    }
}

/// A tool invocation the LLM asked the agent loop to perform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Advertises a callable tool's name, description, and JSON-schema
/// parameters to the LLM provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Optional per-call model configuration (temperature, model id, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

/// The LLM's response to one `complete` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmCompletion {
    pub message: ConversationTurn,
}

impl LlmCompletion {
    #[must_use]
    pub fn new(message: ConversationTurn) -> Self {
        Self { message }
    }

    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.message.tool_calls.is_empty()
    }
}

/// Error surfaced by either capability; wrapped into `VertexError` by the
/// vertex that invoked it. Agent/LLM I/O errors are retryable by default.
#[derive(Debug, Error, Diagnostic)]
pub enum CapabilityError {
    #[error("LLM provider error: {message}")]
    #[diagnostic(code(loomgraph::capabilities::llm))]
    Llm { message: String },

    #[error("tool '{name}' invocation failed: {message}")]
    #[diagnostic(code(loomgraph::capabilities::tool))]
    Tool { name: String, message: String },

    #[error("tool '{name}' is not in the vertex's allow-list")]
    #[diagnostic(
        code(loomgraph::capabilities::tool_not_allowed),
        help("Add '{name}' to the agent vertex's allowed-tool set, or remove the call.")
    )]
    ToolNotAllowed { name: String },
}

/// Text completion with tool-calling, consumed by the Agent vertex.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ConversationTurn],
        tools: &[ToolSpec],
        config: Option<&LlmConfig>,
    ) -> Result<LlmCompletion, CapabilityError>;
}

/// Named external tool invocation with JSON arguments, consumed by the
/// Agent and Tool vertices.
#[async_trait]
pub trait ToolRuntime: Send + Sync {
    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, CapabilityError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A scripted LLM provider: returns queued completions in order.
    pub struct ScriptedLlm {
        responses: Mutex<VecDeque<LlmCompletion>>,
    }

    impl ScriptedLlm {
        pub fn new(responses: Vec<LlmCompletion>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn complete(
            &self,
            _messages: &[ConversationTurn],
            _tools: &[ToolSpec],
            _config: Option<&LlmConfig>,
        ) -> Result<LlmCompletion, CapabilityError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CapabilityError::Llm {
                    message: "no more scripted responses".to_string(),
                })
        }
    }

    /// A tool runtime that echoes back its arguments under a fixed key.
    pub struct EchoTools;

    #[async_trait]
    impl ToolRuntime for EchoTools {
        async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, CapabilityError> {
            Ok(serde_json::json!({ "tool": name, "arguments": arguments }))
        }
    }
}
