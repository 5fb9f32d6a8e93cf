//! The vertex contract and the closed set of built-in vertex kinds,
//! dispatched by value match rather than an open trait-object hierarchy.
//!
//! Generic over an application-supplied [`WorkflowState`], so the same
//! vertex kinds work whether state is plain JSON or a typed struct.

pub mod agent;
pub mod fanin;
pub mod fanout;
pub mod router;
pub mod subagent;
pub mod tool;
pub mod transform;

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::capabilities::{LlmProvider, ToolRuntime};
use crate::channels::errors::{ErrorEvent, LadderError};
use crate::event_bus::{Event, EventEmitter};
use crate::message::{Message, Payload};
use crate::state::WorkflowState;
use crate::types::{VertexId, VertexState};

/// Opaque handle threaded through [`VertexContext`] for sub-agent
/// filesystem isolation.
///
/// The contract between a sub-agent and its parent for file-system
/// isolation is left to the application: the runtime never interprets this
/// value, it is only ever passed through to the vertex and to any nested
/// sub-workflow.
#[derive(Clone, Debug, Default)]
pub struct IsolationContext {
    pub root: Option<String>,
}

/// Everything a vertex's `compute` needs: the superstep index, its combined
/// inbound messages, a read-only state view, sinks for outgoing messages,
/// and handles to the external capabilities.
pub struct VertexContext<'a, S: WorkflowState> {
    pub id: VertexId,
    pub superstep: u64,
    pub state: &'a S,
    pub messages: Vec<Message>,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub tools: Option<Arc<dyn ToolRuntime>>,
    pub isolation: IsolationContext,
    emitter: Arc<dyn EventEmitter>,
    outbox: Vec<Message>,
}

impl<'a, S: WorkflowState> VertexContext<'a, S> {
    pub fn new(
        id: VertexId,
        superstep: u64,
        state: &'a S,
        messages: Vec<Message>,
        llm: Option<Arc<dyn LlmProvider>>,
        tools: Option<Arc<dyn ToolRuntime>>,
        isolation: IsolationContext,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            id,
            superstep,
            state,
            messages,
            llm,
            tools,
            isolation,
            emitter,
            outbox: Vec::new(),
        }
    }

    /// Queue an outgoing message to `target`. Delivered at the start of the
    /// next superstep, never visible to this superstep.
    pub fn send(&mut self, target: VertexId, payload: Payload) {
        self.outbox
            .push(Message::new(self.id.clone(), target, payload));
    }

    /// Emit a vertex-scoped diagnostic event.
    pub fn emit(&self, scope: impl Into<String>, message: impl Into<String>) {
        let _ = self.emitter.emit(Event::vertex_message_with_meta(
            self.id.as_str().to_string(),
            self.superstep,
            scope,
            message,
        ));
    }

    /// Consume the context, returning every message queued via [`Self::send`].
    pub fn into_outbox(self) -> Vec<Message> {
        self.outbox
    }
}

/// The outcome of one `compute` call: the update to merge and the vertex's
/// next halt state.
#[derive(Clone, Debug)]
pub struct VertexOutcome<U> {
    pub update: U,
    pub next_state: VertexState,
}

impl<U> VertexOutcome<U> {
    #[must_use]
    pub fn halted(update: U) -> Self {
        Self {
            update,
            next_state: VertexState::Halted,
        }
    }

    #[must_use]
    pub fn active(update: U) -> Self {
        Self {
            update,
            next_state: VertexState::Active,
        }
    }

    #[must_use]
    pub fn completed(update: U) -> Self {
        Self {
            update,
            next_state: VertexState::Completed,
        }
    }
}

/// A vertex-internal failure. Non-fatal within one superstep — other
/// vertices still commit — but fails the workflow after the superstep
/// unless retries remain and `retryable` permits it.
#[derive(Debug, Error, Diagnostic)]
#[error("vertex '{id}' failed at superstep {superstep}: {message}")]
#[diagnostic(code(loomgraph::vertex::error))]
pub struct VertexError {
    pub id: VertexId,
    pub superstep: u64,
    pub message: String,
    pub retryable: bool,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl VertexError {
    #[must_use]
    pub fn new(id: VertexId, superstep: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            superstep,
            message: message.into(),
            retryable: true,
            source: None,
        }
    }

    #[must_use]
    pub fn non_retryable(mut self) -> Self {
        self.retryable = false;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Render this failure as the same `when`/`tags`/`context` envelope the
    /// rest of the crate uses for error reporting.
    #[must_use]
    pub fn to_error_event(&self) -> ErrorEvent {
        ErrorEvent::node(
            self.id.as_str(),
            self.superstep,
            LadderError::msg(self.message.clone()),
        )
        .with_tag(if self.retryable {
            "retryable"
        } else {
            "fatal"
        })
    }
}

/// The closed set of built-in vertex kinds, dispatched by value match
/// rather than dynamic dispatch.
pub enum VertexKind<S: WorkflowState> {
    Agent(agent::AgentConfig),
    Tool(tool::ToolConfig),
    Router(router::RouterConfig<S>),
    SubAgent(subagent::SubAgentConfig),
    FanOut(fanout::FanOutConfig),
    FanIn(fanin::FanInConfig),
    Transform(transform::TransformConfig<S>),
}

impl<S: WorkflowState> VertexKind<S> {
    pub async fn compute(
        &self,
        ctx: &mut VertexContext<'_, S>,
    ) -> Result<VertexOutcome<S::Update>, VertexError> {
        match self {
            VertexKind::Agent(cfg) => agent::compute(cfg, ctx).await,
            VertexKind::Tool(cfg) => tool::compute(cfg, ctx).await,
            VertexKind::Router(cfg) => router::compute(cfg, ctx).await,
            VertexKind::SubAgent(cfg) => subagent::compute(cfg, ctx).await,
            VertexKind::FanOut(cfg) => fanout::compute(cfg, ctx).await,
            VertexKind::FanIn(cfg) => fanin::compute(cfg, ctx).await,
            VertexKind::Transform(cfg) => transform::compute(cfg, ctx),
        }
    }

    /// Vertex-local reducer applied to incoming messages before `compute`
    /// sees them. Identity for every kind except Agent, which deduplicates
    /// repeated activations.
    #[must_use]
    pub fn combine_messages(&self, messages: Vec<Message>) -> Vec<Message> {
        match self {
            VertexKind::Agent(cfg) => agent::combine_messages(cfg, messages),
            _ => messages,
        }
    }

    /// Whether a failure from this vertex kind is retryable by default:
    /// routers never retry routing failures, every other kind does.
    #[must_use]
    pub fn retryable_by_default(&self) -> bool {
        !matches!(self, VertexKind::Router(_))
    }

    /// The declared barrier membership for a FanIn vertex, `None` for every
    /// other kind. The runtime uses this to decide when a source that has
    /// gone `Completed` without ever sending should be treated as a null
    /// contribution rather than leaving the barrier waiting forever —
    /// `fanin::compute` itself only sees messages it has actually received
    /// and has no visibility into global vertex completion state.
    #[must_use]
    pub fn fanin_sources(&self) -> Option<&[VertexId]> {
        match self {
            VertexKind::FanIn(cfg) => Some(&cfg.sources),
            _ => None,
        }
    }
}

/// One vertex in a compiled graph: a stable identity plus its kind.
pub struct Vertex<S: WorkflowState> {
    pub id: VertexId,
    pub kind: VertexKind<S>,
}

impl<S: WorkflowState> Vertex<S> {
    #[must_use]
    pub fn new(id: impl Into<VertexId>, kind: VertexKind<S>) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{JsonState, JsonUpdate, StateUpdate};

    #[test]
    fn router_kind_is_not_retryable_by_default() {
        let kind: VertexKind<JsonState> = VertexKind::Router(router::RouterConfig::state_field(
            "status",
            vec![],
            None,
        ));
        assert!(!kind.retryable_by_default());
    }

    #[test]
    fn outcome_constructors_set_expected_halt_state() {
        let halted = VertexOutcome::halted(JsonUpdate::empty());
        assert!(halted.next_state.is_halted());
        let active = VertexOutcome::active(JsonUpdate::empty());
        assert!(active.next_state.is_active());
    }
}
