//! Static topology edges and the conditional-edge predicate type.
//!
//! An unconditional edge is just a `from -> to` pair in the builder's
//! adjacency map, while a conditional edge carries a predicate deciding
//! which of several declared targets fire. The predicate closes over the
//! generic [`WorkflowState::project`] JSON view rather than a concrete
//! state type, so it stays independent of the application's state shape.

use std::sync::Arc;

use serde_json::Value;

use crate::types::VertexId;

/// A predicate deciding which declared targets a conditional edge activates
/// for, given the current state's JSON projection.
pub type EdgePredicate = Arc<dyn Fn(&Value) -> Vec<VertexId> + Send + Sync + 'static>;

/// An edge whose destination is chosen dynamically from the state, rather
/// than always firing to a fixed target.
#[derive(Clone)]
pub struct ConditionalEdge {
    pub from: VertexId,
    pub predicate: EdgePredicate,
}

impl ConditionalEdge {
    #[must_use]
    pub fn new(from: impl Into<VertexId>, predicate: EdgePredicate) -> Self {
        Self {
            from: from.into(),
            predicate,
        }
    }
}

impl std::fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}
