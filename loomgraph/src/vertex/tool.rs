//! The Tool vertex: a single named tool invocation with arguments drawn
//! from a static value, a state path, or the triggering message's payload.
//!
//! Lifted out of the Agent vertex's own tool-execution path into a
//! standalone vertex kind, for graphs that need a bare tool call without an
//! LLM driving it.

use serde_json::Value;

use crate::message::Payload;
use crate::state::{StateUpdate, WorkflowState};
use crate::types::VertexId;
use crate::utils::json_ext;

use super::{VertexContext, VertexError, VertexOutcome};

/// Where a Tool vertex's call arguments come from.
#[derive(Clone, Debug)]
pub enum ToolArgSource {
    /// A fixed JSON value, supplied at graph-build time.
    Static(Value),
    /// A dotted path into the current state's JSON projection.
    StatePath(String),
    /// The JSON payload of the triggering message, if any.
    MessagePayload,
}

#[derive(Clone, Debug)]
pub struct ToolConfig {
    pub tool_name: String,
    pub arg_source: ToolArgSource,
    /// Vertex that receives the tool's result as a `Payload::Json` message.
    pub output_target: VertexId,
}

impl ToolConfig {
    #[must_use]
    pub fn new(
        tool_name: impl Into<String>,
        arg_source: ToolArgSource,
        output_target: impl Into<VertexId>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            arg_source,
            output_target: output_target.into(),
        }
    }
}

pub(super) async fn compute<S: WorkflowState>(
    cfg: &ToolConfig,
    ctx: &mut VertexContext<'_, S>,
) -> Result<VertexOutcome<S::Update>, VertexError> {
    let tools = ctx.tools.clone().ok_or_else(|| {
        VertexError::new(ctx.id.clone(), ctx.superstep, "tool vertex has no tool runtime")
            .non_retryable()
    })?;

    let args = match &cfg.arg_source {
        ToolArgSource::Static(value) => value.clone(),
        ToolArgSource::StatePath(path) => {
            let projected = ctx.state.project();
            json_ext::get_by_path(&projected, path)
                .cloned()
                .unwrap_or(Value::Null)
        }
        ToolArgSource::MessagePayload => ctx
            .messages
            .first()
            .and_then(|m| m.payload.as_json())
            .cloned()
            .unwrap_or(Value::Null),
    };

    let result = tools.invoke(&cfg.tool_name, args).await.map_err(|e| {
        VertexError::new(ctx.id.clone(), ctx.superstep, e.to_string()).with_source(e)
    })?;

    ctx.send(cfg.output_target.clone(), Payload::Json(result));
    Ok(VertexOutcome::halted(S::Update::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::test_support::EchoTools;
    use crate::event_bus::EventHub;
    use crate::state::JsonState;
    use crate::vertex::IsolationContext;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn static_args_are_forwarded_to_the_tool_runtime() {
        let cfg = ToolConfig::new(
            "search",
            ToolArgSource::Static(json!({"q": "rust"})),
            VertexId::new("output"),
        );
        let state = JsonState::empty();
        let hub = EventHub::new(4);
        let mut ctx = VertexContext::new(
            VertexId::new("tool"),
            0,
            &state,
            vec![],
            None,
            Some(Arc::new(EchoTools)),
            IsolationContext::default(),
            Arc::new(hub.emitter()),
        );
        let outcome = compute(&cfg, &mut ctx).await.unwrap();
        assert!(outcome.next_state.is_halted());
        let outbox = ctx.into_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].payload.as_json().unwrap()["tool"], "search");
    }

    #[tokio::test]
    async fn missing_tool_runtime_is_a_non_retryable_error() {
        let cfg = ToolConfig::new("search", ToolArgSource::Static(json!({})), VertexId::new("o"));
        let state = JsonState::empty();
        let hub = EventHub::new(4);
        let mut ctx: VertexContext<'_, JsonState> = VertexContext::new(
            VertexId::new("tool"),
            0,
            &state,
            vec![],
            None,
            None,
            IsolationContext::default(),
            Arc::new(hub.emitter()),
        );
        let err = compute(&cfg, &mut ctx).await.unwrap_err();
        assert!(!err.retryable);
    }
}
