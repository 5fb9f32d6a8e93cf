//! The Agent vertex: an LLM-driven loop that calls tools until a stop
//! condition is met, then forwards its final answer downstream.
//!
//! Builds a system-prompt-plus-history conversation, makes one LLM call per
//! iteration, and checks the stop-condition checklist after each, routing
//! capability calls through [`VertexContext`] instead of owning its own
//! LLM/tool handles.

use serde_json::Value;

use crate::capabilities::{ConversationTurn, ToolSpec};
use crate::message::{Message, Payload};
use crate::state::{StateUpdate, WorkflowState};
use crate::types::VertexId;
use crate::utils::json_ext;

use super::{VertexContext, VertexError, VertexOutcome};

/// Terminates the agent's tool-calling loop.
#[derive(Clone, Debug, PartialEq)]
pub enum StopCondition {
    /// The assistant replied with no tool calls.
    NoToolCalls,
    /// The assistant called the named tool.
    OnTool { tool_name: String },
    /// The assistant's reply contains the given substring.
    ContainsText { pattern: String },
    /// The loop ran for `count` iterations.
    MaxIterations { count: usize },
    /// A dotted path into the workflow state's JSON projection equals `value`.
    StateMatch { path: String, value: Value },
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub system_prompt: String,
    pub stop_conditions: Vec<StopCondition>,
    pub max_iterations: usize,
    pub allowed_tools: Option<Vec<String>>,
    pub tool_specs: Vec<ToolSpec>,
    /// Vertex that receives the agent's final answer as a `Payload::Json`
    /// `{"content": ...}` message.
    pub output_target: VertexId,
}

impl AgentConfig {
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, output_target: impl Into<VertexId>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            stop_conditions: vec![StopCondition::NoToolCalls],
            max_iterations: 10,
            allowed_tools: None,
            tool_specs: Vec::new(),
            output_target: output_target.into(),
        }
    }

    #[must_use]
    pub fn with_stop_conditions(mut self, conditions: Vec<StopCondition>) -> Self {
        self.stop_conditions = conditions;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = Some(tools);
        self
    }

    #[must_use]
    pub fn with_tool_specs(mut self, specs: Vec<ToolSpec>) -> Self {
        self.tool_specs = specs;
        self
    }

    fn check_stop(&self, turn: &ConversationTurn, iteration: usize, state_json: &Value) -> bool {
        self.stop_conditions.iter().any(|cond| match cond {
            StopCondition::NoToolCalls => turn.tool_calls.is_empty(),
            StopCondition::OnTool { tool_name } => {
                turn.tool_calls.iter().any(|tc| &tc.name == tool_name)
            }
            StopCondition::ContainsText { pattern } => turn.content.contains(pattern.as_str()),
            StopCondition::MaxIterations { count } => iteration >= *count,
            StopCondition::StateMatch { path, value } => {
                json_ext::get_by_path(state_json, path) == Some(value)
            }
        })
    }
}

/// Collapse repeated wake-only activations so a halted agent reactivated by
/// several upstream vertices in the same superstep runs its loop once.
pub(super) fn combine_messages(_cfg: &AgentConfig, messages: Vec<Message>) -> Vec<Message> {
    let mut seen_activate = false;
    let mut out = Vec::with_capacity(messages.len());
    for m in messages {
        if matches!(m.payload, Payload::Activate) {
            if seen_activate {
                continue;
            }
            seen_activate = true;
        }
        out.push(m);
    }
    out
}

pub(super) async fn compute<S: WorkflowState>(
    cfg: &AgentConfig,
    ctx: &mut VertexContext<'_, S>,
) -> Result<VertexOutcome<S::Update>, VertexError> {
    let llm = ctx.llm.clone().ok_or_else(|| {
        VertexError::new(ctx.id.clone(), ctx.superstep, "agent vertex has no LLM provider")
            .non_retryable()
    })?;

    let mut history = vec![ConversationTurn::system(cfg.system_prompt.clone())];
    for msg in &ctx.messages {
        if let Some(value) = msg.payload.as_json() {
            history.push(ConversationTurn::user(value.to_string()));
        }
    }
    if history.len() == 1 {
        history.push(ConversationTurn::user("Begin processing."));
    }

    let tools: Vec<ToolSpec> = match &cfg.allowed_tools {
        Some(allowed) => cfg
            .tool_specs
            .iter()
            .filter(|t| allowed.contains(&t.name))
            .cloned()
            .collect(),
        None => cfg.tool_specs.clone(),
    };

    let state_json = ctx.state.project();

    for iteration in 0..cfg.max_iterations {
        let completion = llm
            .complete(&history, &tools, None)
            .await
            .map_err(|e| {
                VertexError::new(ctx.id.clone(), ctx.superstep, e.to_string()).with_source(e)
            })?;
        let assistant_turn = completion.message;
        history.push(assistant_turn.clone());

        if cfg.check_stop(&assistant_turn, iteration, &state_json) {
            ctx.send(
                cfg.output_target.clone(),
                Payload::Json(serde_json::json!({ "content": assistant_turn.content })),
            );
            return Ok(VertexOutcome::halted(S::Update::empty()));
        }

        if assistant_turn.tool_calls.is_empty() {
            ctx.send(
                cfg.output_target.clone(),
                Payload::Json(serde_json::json!({ "content": assistant_turn.content })),
            );
            return Ok(VertexOutcome::halted(S::Update::empty()));
        }

        let tools_rt = ctx.tools.clone().ok_or_else(|| {
            VertexError::new(ctx.id.clone(), ctx.superstep, "agent vertex has no tool runtime")
                .non_retryable()
        })?;

        for call in &assistant_turn.tool_calls {
            if let Some(allowed) = &cfg.allowed_tools {
                if !allowed.contains(&call.name) {
                    history.push(ConversationTurn::tool_result(
                        format!("Error: tool '{}' is not allowed for this agent.", call.name),
                        call.id.clone(),
                    ));
                    continue;
                }
            }
            let result = tools_rt.invoke(&call.name, call.arguments.clone()).await;
            match result {
                Ok(value) => {
                    history.push(ConversationTurn::tool_result(value.to_string(), call.id.clone()));
                }
                Err(err) => {
                    history.push(ConversationTurn::tool_result(
                        format!("Error: {err}"),
                        call.id.clone(),
                    ));
                }
            }
        }
    }

    Err(VertexError::new(
        ctx.id.clone(),
        ctx.superstep,
        format!("agent loop exceeded max_iterations ({})", cfg.max_iterations),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::{EchoTools, ScriptedLlm};
    use crate::capabilities::LlmCompletion;
    use crate::event_bus::EventHub;
    use crate::state::JsonState;
    use crate::vertex::IsolationContext;
    use std::sync::Arc;

    fn ctx_for<'a>(
        state: &'a JsonState,
        messages: Vec<Message>,
        llm: Arc<dyn crate::capabilities::LlmProvider>,
    ) -> VertexContext<'a, JsonState> {
        let hub = EventHub::new(16);
        VertexContext::new(
            VertexId::new("agent"),
            0,
            state,
            messages,
            Some(llm),
            Some(Arc::new(EchoTools)),
            IsolationContext::default(),
            Arc::new(hub.emitter()),
        )
    }

    #[tokio::test]
    async fn halts_immediately_when_no_tool_calls() {
        let llm = Arc::new(ScriptedLlm::new(vec![LlmCompletion::new(
            ConversationTurn::assistant("hello there"),
        )]));
        let cfg = AgentConfig::new("you are helpful", VertexId::new("output"));
        let state = JsonState::empty();
        let mut ctx = ctx_for(&state, vec![], llm);
        let outcome = compute(&cfg, &mut ctx).await.unwrap();
        assert!(outcome.next_state.is_halted());
        let outbox = ctx.into_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].target, VertexId::new("output"));
    }

    #[tokio::test]
    async fn runs_tool_then_halts() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            LlmCompletion::new(
                ConversationTurn::assistant("let me check").with_tool_calls(vec![
                    crate::capabilities::ToolCallRequest {
                        id: "call-1".into(),
                        name: "search".into(),
                        arguments: serde_json::json!({"q": "rust"}),
                    },
                ]),
            ),
            LlmCompletion::new(ConversationTurn::assistant("done")),
        ]));
        let cfg = AgentConfig::new("system", VertexId::new("output")).with_max_iterations(5);
        let state = JsonState::empty();
        let mut ctx = ctx_for(&state, vec![], llm);
        let outcome = compute(&cfg, &mut ctx).await.unwrap();
        assert!(outcome.next_state.is_halted());
    }

    #[test]
    fn combine_messages_dedupes_activations() {
        let cfg = AgentConfig::new("s", VertexId::new("o"));
        let msgs = vec![
            Message::activate(VertexId::new("a"), VertexId::new("agent")),
            Message::activate(VertexId::new("b"), VertexId::new("agent")),
            Message::data(VertexId::new("c"), VertexId::new("agent"), serde_json::json!(1)),
        ];
        let combined = combine_messages(&cfg, msgs);
        assert_eq!(combined.len(), 2);
    }
}
