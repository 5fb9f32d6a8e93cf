//! The SubAgent vertex: delegates to either a one-shot system-prompted LLM
//! call or a nested compiled workflow, behind an opaque isolation handle.
//!
//! Nested-workflow execution is deferred to an injected callback rather
//! than depending on the runner module directly, avoiding a dependency
//! cycle between `vertex` and `runtimes`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::capabilities::ConversationTurn;
use crate::message::Payload;
use crate::state::{StateUpdate, WorkflowState};
use crate::types::VertexId;
use crate::utils::json_ext;

use super::{IsolationContext, VertexContext, VertexError, VertexOutcome};

pub type SubWorkflowFuture =
    Pin<Box<dyn Future<Output = Result<Value, String>> + Send>>;

/// Invokes a nested workflow, isolated from the parent's own state type.
pub type SubWorkflowFn = Arc<dyn Fn(Value, IsolationContext) -> SubWorkflowFuture + Send + Sync>;

#[derive(Clone)]
pub enum SubAgentKind {
    /// A single system-prompted LLM call over the mapped input.
    Simple { system_prompt: String },
    /// A nested compiled workflow, invoked through an opaque callback.
    Workflow { run: SubWorkflowFn },
}

impl fmt::Debug for SubAgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubAgentKind::Simple { system_prompt } => {
                f.debug_struct("Simple").field("system_prompt", system_prompt).finish()
            }
            SubAgentKind::Workflow { .. } => f.debug_struct("Workflow").finish_non_exhaustive(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SubAgentConfig {
    pub kind: SubAgentKind,
    /// Dotted path into the parent state's JSON projection supplying the
    /// sub-agent's input; `None` forwards the triggering message's payload.
    pub input_path: Option<String>,
    pub output_target: VertexId,
    pub max_recursion: u32,
}

impl SubAgentConfig {
    #[must_use]
    pub fn simple(system_prompt: impl Into<String>, output_target: impl Into<VertexId>) -> Self {
        Self {
            kind: SubAgentKind::Simple {
                system_prompt: system_prompt.into(),
            },
            input_path: None,
            output_target: output_target.into(),
            max_recursion: 1,
        }
    }

    #[must_use]
    pub fn workflow(run: SubWorkflowFn, output_target: impl Into<VertexId>) -> Self {
        Self {
            kind: SubAgentKind::Workflow { run },
            input_path: None,
            output_target: output_target.into(),
            max_recursion: 8,
        }
    }

    #[must_use]
    pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
        self.input_path = Some(path.into());
        self
    }
}

fn resolve_input<S: WorkflowState>(cfg: &SubAgentConfig, ctx: &VertexContext<'_, S>) -> Value {
    if let Some(path) = &cfg.input_path {
        let projected = ctx.state.project();
        return json_ext::get_by_path(&projected, path)
            .cloned()
            .unwrap_or(Value::Null);
    }
    ctx.messages
        .first()
        .and_then(|m| m.payload.as_json())
        .cloned()
        .unwrap_or(Value::Null)
}

pub(super) async fn compute<S: WorkflowState>(
    cfg: &SubAgentConfig,
    ctx: &mut VertexContext<'_, S>,
) -> Result<VertexOutcome<S::Update>, VertexError> {
    let input = resolve_input(cfg, ctx);

    let output = match &cfg.kind {
        SubAgentKind::Simple { system_prompt } => {
            let llm = ctx.llm.clone().ok_or_else(|| {
                VertexError::new(ctx.id.clone(), ctx.superstep, "sub-agent has no LLM provider")
                    .non_retryable()
            })?;
            let turns = vec![
                ConversationTurn::system(system_prompt.clone()),
                ConversationTurn::user(input.to_string()),
            ];
            let completion = llm.complete(&turns, &[], None).await.map_err(|e| {
                VertexError::new(ctx.id.clone(), ctx.superstep, e.to_string()).with_source(e)
            })?;
            serde_json::json!({ "content": completion.message.content })
        }
        SubAgentKind::Workflow { run } => run(input, ctx.isolation.clone())
            .await
            .map_err(|message| VertexError::new(ctx.id.clone(), ctx.superstep, message))?,
    };

    ctx.send(cfg.output_target.clone(), Payload::Json(output));
    Ok(VertexOutcome::halted(S::Update::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::ScriptedLlm;
    use crate::capabilities::LlmCompletion;
    use crate::event_bus::EventHub;
    use crate::state::JsonState;
    use serde_json::json;

    #[tokio::test]
    async fn simple_kind_calls_llm_and_forwards_content() {
        let llm = Arc::new(ScriptedLlm::new(vec![LlmCompletion::new(
            ConversationTurn::assistant("sub-agent result"),
        )]));
        let cfg = SubAgentConfig::simple("You summarize.", VertexId::new("output"));
        let state = JsonState::new(json!({"topic": "rust"}));
        let hub = EventHub::new(4);
        let mut ctx = VertexContext::new(
            VertexId::new("sub"),
            0,
            &state,
            vec![],
            Some(llm),
            None,
            IsolationContext::default(),
            Arc::new(hub.emitter()),
        );
        let outcome = compute(&cfg, &mut ctx).await.unwrap();
        assert!(outcome.next_state.is_halted());
        let outbox = ctx.into_outbox();
        assert_eq!(outbox[0].payload.as_json().unwrap()["content"], "sub-agent result");
    }

    #[tokio::test]
    async fn workflow_kind_invokes_injected_callback() {
        let run: SubWorkflowFn = Arc::new(|input, _iso| {
            Box::pin(async move { Ok(json!({ "echo": input })) })
        });
        let cfg = SubAgentConfig::workflow(run, VertexId::new("output")).with_input_path("topic");
        let state = JsonState::new(json!({"topic": "graphs"}));
        let hub = EventHub::new(4);
        let mut ctx: VertexContext<'_, JsonState> = VertexContext::new(
            VertexId::new("sub"),
            0,
            &state,
            vec![],
            None,
            None,
            IsolationContext::default(),
            Arc::new(hub.emitter()),
        );
        let outcome = compute(&cfg, &mut ctx).await.unwrap();
        assert!(outcome.next_state.is_halted());
        let outbox = ctx.into_outbox();
        assert_eq!(outbox[0].payload.as_json().unwrap()["echo"], "graphs");
    }
}
