//! The Transform vertex: a pure, synchronous state-update function.
//!
//! Graphs built from generic state need a way to compute a typed
//! [`WorkflowState::Update`] from the current state and inbound messages
//! without going through an LLM or tool call — a direct-function dispatch
//! generalized over `S`.

use std::fmt;
use std::sync::Arc;

use crate::message::{Message, Payload};
use crate::state::WorkflowState;
use crate::types::VertexId;

use super::{VertexContext, VertexError, VertexOutcome};

/// A pure function from `(state, inbound messages)` to an update.
pub type TransformFn<S> =
    Arc<dyn Fn(&S, &[Message]) -> <S as WorkflowState>::Update + Send + Sync>;

#[derive(Clone)]
pub struct TransformConfig<S: WorkflowState> {
    pub f: TransformFn<S>,
    pub forward_to: Option<VertexId>,
}

impl<S: WorkflowState> fmt::Debug for TransformConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformConfig")
            .field("forward_to", &self.forward_to)
            .finish_non_exhaustive()
    }
}

impl<S: WorkflowState> TransformConfig<S> {
    #[must_use]
    pub fn new(f: TransformFn<S>) -> Self {
        Self { f, forward_to: None }
    }

    #[must_use]
    pub fn forward_to(mut self, target: impl Into<VertexId>) -> Self {
        self.forward_to = Some(target.into());
        self
    }
}

pub(super) fn compute<S: WorkflowState>(
    cfg: &TransformConfig<S>,
    ctx: &mut VertexContext<'_, S>,
) -> Result<VertexOutcome<S::Update>, VertexError> {
    let update = (cfg.f)(ctx.state, &ctx.messages);
    if let Some(target) = &cfg.forward_to {
        ctx.send(target.clone(), Payload::Activate);
    }
    Ok(VertexOutcome::halted(update))
}
