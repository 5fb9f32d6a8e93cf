//! The immutable, runnable output of [`super::builder::GraphBuilder::compile`].

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::runtimes::RuntimeConfig;
use crate::state::WorkflowState;
use crate::types::VertexId;
use crate::vertex::Vertex;

use super::edges::ConditionalEdge;

/// A validated, immutable workflow graph ready for a runtime to execute.
///
/// Construct via [`super::builder::GraphBuilder::compile`]; there is no
/// public constructor, so every `CompiledGraph` in existence has already
/// passed topology validation.
pub struct CompiledGraph<S: WorkflowState> {
    vertices: FxHashMap<VertexId, Vertex<S>>,
    edges: FxHashMap<VertexId, Vec<VertexId>>,
    conditional_edges: Vec<ConditionalEdge>,
    entry: VertexId,
    runtime_config: RuntimeConfig,
}

impl<S: WorkflowState> CompiledGraph<S> {
    pub(super) fn new(
        vertices: FxHashMap<VertexId, Vertex<S>>,
        edges: FxHashMap<VertexId, Vec<VertexId>>,
        conditional_edges: Vec<ConditionalEdge>,
        entry: VertexId,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            vertices,
            edges,
            conditional_edges,
            entry,
            runtime_config,
        }
    }

    #[must_use]
    pub fn entry(&self) -> &VertexId {
        &self.entry
    }

    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    #[must_use]
    pub fn vertex(&self, id: &VertexId) -> Option<&Vertex<S>> {
        self.vertices.get(id)
    }

    #[must_use]
    pub fn vertex_ids(&self) -> impl Iterator<Item = &VertexId> {
        self.vertices.keys()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Static successors of `id` via unconditional edges only.
    #[must_use]
    pub fn successors(&self, id: &VertexId) -> &[VertexId] {
        self.edges.get(id).map_or(&[], Vec::as_slice)
    }

    /// Evaluate every conditional edge declared for `from` against `state`,
    /// returning the union of targets their predicates select.
    #[must_use]
    pub fn conditional_successors(&self, from: &VertexId, state: &S) -> Vec<VertexId> {
        let projected: Value = state.project();
        self.conditional_edges
            .iter()
            .filter(|edge| &edge.from == from)
            .flat_map(|edge| (edge.predicate)(&projected))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::builder::GraphBuilder;
    use crate::message::Message;
    use crate::state::{JsonState, JsonUpdate, StateUpdate};
    use crate::vertex::transform::TransformConfig;
    use crate::vertex::VertexKind;
    use serde_json::json;
    use std::sync::Arc;

    fn noop_vertex(id: &str) -> Vertex<JsonState> {
        Vertex::new(
            id,
            VertexKind::Transform(TransformConfig::new(Arc::new(
                |_s: &JsonState, _m: &[Message]| JsonUpdate::empty(),
            ))),
        )
    }

    #[test]
    fn successors_reflect_unconditional_edges() {
        let graph = GraphBuilder::new()
            .add_vertex(noop_vertex("a"))
            .add_vertex(noop_vertex("b"))
            .entry("a")
            .add_edge("a", "b")
            .compile()
            .unwrap();
        assert_eq!(graph.successors(&VertexId::new("a")), &[VertexId::new("b")]);
        assert!(graph.successors(&VertexId::new("b")).is_empty());
    }

    #[test]
    fn conditional_successors_evaluate_the_predicate_against_projected_state() {
        let predicate: super::super::edges::EdgePredicate = Arc::new(|state: &Value| {
            if state.get("go_right").and_then(Value::as_bool).unwrap_or(false) {
                vec![VertexId::new("right")]
            } else {
                vec![VertexId::new("left")]
            }
        });
        let graph = GraphBuilder::new()
            .add_vertex(noop_vertex("a"))
            .add_vertex(noop_vertex("left"))
            .add_vertex(noop_vertex("right"))
            .entry("a")
            .add_conditional_edge("a", predicate)
            .compile()
            .unwrap();
        let state = JsonState::new(json!({"go_right": true}));
        assert_eq!(
            graph.conditional_successors(&VertexId::new("a"), &state),
            vec![VertexId::new("right")]
        );
    }
}
