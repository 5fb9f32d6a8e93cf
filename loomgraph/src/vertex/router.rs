//! The Router vertex: conditional dispatch to one of several downstream
//! targets, decided either by inspecting the state or by asking an LLM.
//!
//! Reads the state through [`WorkflowState::project`] rather than requiring
//! `S: Serialize` at the call site, so branch conditions can inspect any
//! projected JSON shape regardless of the concrete state type in use.

use std::marker::PhantomData;

use regex::Regex;
use serde_json::Value;

use crate::capabilities::ConversationTurn;
use crate::message::Payload;
use crate::state::{StateUpdate, WorkflowState};
use crate::types::VertexId;
use crate::utils::json_ext;

use super::{VertexContext, VertexError, VertexOutcome};

#[derive(Clone, Debug)]
pub enum BranchCondition {
    Equals(Value),
    In(Vec<Value>),
    Matches(String),
    IsTruthy,
    IsFalsy,
    Always,
}

impl BranchCondition {
    fn evaluate(&self, value: &Value) -> bool {
        match self {
            BranchCondition::Equals(expected) => value == expected,
            BranchCondition::In(values) => values.contains(value),
            BranchCondition::Matches(pattern) => value
                .as_str()
                .and_then(|s| Regex::new(pattern).ok().map(|re| re.is_match(s)))
                .unwrap_or(false),
            BranchCondition::IsTruthy => is_truthy(value),
            BranchCondition::IsFalsy => !is_truthy(value),
            BranchCondition::Always => true,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

#[derive(Clone, Debug)]
pub struct Branch {
    pub condition: BranchCondition,
    pub target: VertexId,
}

impl Branch {
    #[must_use]
    pub fn new(condition: BranchCondition, target: impl Into<VertexId>) -> Self {
        Self {
            condition,
            target: target.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum RoutingStrategy {
    StateField { path: String },
    Llm { prompt: String },
}

#[derive(Clone, Debug)]
pub struct RouterConfig<S> {
    pub strategy: RoutingStrategy,
    pub branches: Vec<Branch>,
    pub default: Option<VertexId>,
    _phantom: PhantomData<S>,
}

impl<S: WorkflowState> RouterConfig<S> {
    #[must_use]
    pub fn state_field(
        path: impl Into<String>,
        branches: Vec<Branch>,
        default: Option<VertexId>,
    ) -> Self {
        Self {
            strategy: RoutingStrategy::StateField { path: path.into() },
            branches,
            default,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn llm_decision(
        prompt: impl Into<String>,
        branches: Vec<Branch>,
        default: Option<VertexId>,
    ) -> Self {
        Self {
            strategy: RoutingStrategy::Llm { prompt: prompt.into() },
            branches,
            default,
            _phantom: PhantomData,
        }
    }
}

fn pick_by_state<S: WorkflowState>(
    cfg: &RouterConfig<S>,
    path: &str,
    state_json: &Value,
) -> Option<VertexId> {
    let value = json_ext::get_by_path(state_json, path)?;
    cfg.branches
        .iter()
        .find(|b| b.condition.evaluate(value))
        .map(|b| b.target.clone())
}

async fn pick_by_llm<S: WorkflowState>(
    cfg: &RouterConfig<S>,
    prompt: &str,
    ctx: &VertexContext<'_, S>,
) -> Result<Option<VertexId>, VertexError> {
    let llm = ctx.llm.clone().ok_or_else(|| {
        VertexError::new(ctx.id.clone(), ctx.superstep, "router requires an LLM provider")
            .non_retryable()
    })?;

    let mut routing_prompt = prompt.to_string();
    routing_prompt.push_str("\n\nAvailable branches:\n");
    for branch in &cfg.branches {
        routing_prompt.push_str(&format!("- {}\n", branch.target));
    }
    routing_prompt.push_str("\nRespond with only the target branch name.");

    let completion = llm
        .complete(&[ConversationTurn::user(routing_prompt)], &[], None)
        .await
        .map_err(|e| {
            VertexError::new(ctx.id.clone(), ctx.superstep, e.to_string()).with_source(e)
        })?;

    let content = completion.message.content.trim();
    Ok(cfg
        .branches
        .iter()
        .find(|b| b.target.as_str() == content || content.contains(b.target.as_str()))
        .map(|b| b.target.clone()))
}

pub(super) async fn compute<S: WorkflowState>(
    cfg: &RouterConfig<S>,
    ctx: &mut VertexContext<'_, S>,
) -> Result<VertexOutcome<S::Update>, VertexError> {
    let state_json = ctx.state.project();
    let target = match &cfg.strategy {
        RoutingStrategy::StateField { path } => pick_by_state(cfg, path, &state_json),
        RoutingStrategy::Llm { prompt } => pick_by_llm(cfg, prompt, ctx).await?,
    }
    .or_else(|| cfg.default.clone());

    let Some(target) = target else {
        return Err(VertexError::new(
            ctx.id.clone(),
            ctx.superstep,
            "no branch matched and no default_branch is configured",
        )
        .non_retryable());
    };

    if ctx.messages.is_empty() {
        ctx.send(target, Payload::Activate);
    } else {
        for msg in ctx.messages.clone() {
            ctx.send(target.clone(), msg.payload);
        }
    }

    Ok(VertexOutcome::halted(S::Update::empty()))
}
