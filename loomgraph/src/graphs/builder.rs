//! The fluent graph-construction API.
//!
//! Consuming-`self` fluent methods accumulate vertices, unconditional
//! edges, and conditional edges before a final `compile()` produces an
//! immutable graph, generic over [`WorkflowState`] and the closed-enum
//! [`VertexKind`]. The designated entry vertex plays the role a virtual
//! start node would in a graph with no distinguished entry point.

use rustc_hash::FxHashMap;

use crate::runtimes::RuntimeConfig;
use crate::state::WorkflowState;
use crate::types::VertexId;
use crate::vertex::Vertex;

use super::compiled::CompiledGraph;
use super::edges::{ConditionalEdge, EdgePredicate};
use super::validate::{self, GraphBuildError};

/// Builder for constructing a Pregel workflow graph.
///
/// Vertices and edges accumulate through fluent, consuming-`self` calls;
/// [`GraphBuilder::compile`] validates the accumulated topology and produces
/// an immutable [`CompiledGraph`].
pub struct GraphBuilder<S: WorkflowState> {
    vertices: Vec<Vertex<S>>,
    edges: FxHashMap<VertexId, Vec<VertexId>>,
    conditional_edges: Vec<ConditionalEdge>,
    entry: Option<VertexId>,
    runtime_config: RuntimeConfig,
}

impl<S: WorkflowState> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WorkflowState> GraphBuilder<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            edges: FxHashMap::default(),
            conditional_edges: Vec::new(),
            entry: None,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Register a vertex. Registering the reserved `END` sentinel is
    /// ignored with a warning — it is a routing target, not a vertex an
    /// application can define its own compute for.
    #[must_use]
    pub fn add_vertex(mut self, vertex: Vertex<S>) -> Self {
        if vertex.id.is_end() {
            tracing::warn!("ignoring attempt to register the reserved END vertex");
            return self;
        }
        self.vertices.push(vertex);
        self
    }

    /// Designate the vertex that receives the workflow's initial activation.
    #[must_use]
    pub fn entry(mut self, id: impl Into<VertexId>) -> Self {
        self.entry = Some(id.into());
        self
    }

    /// Add an unconditional edge, used for entry-reachability and cycle
    /// diagnostics at compile time. `to` may be [`VertexId::end`].
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<VertexId>, to: impl Into<VertexId>) -> Self {
        self.edges.entry(from.into()).or_default().push(to.into());
        self
    }

    /// Add a conditional edge whose target is chosen by `predicate` from the
    /// committed state at the end of `from`'s superstep.
    #[must_use]
    pub fn add_conditional_edge(
        mut self,
        from: impl Into<VertexId>,
        predicate: EdgePredicate,
    ) -> Self {
        self.conditional_edges
            .push(ConditionalEdge::new(from, predicate));
        self
    }

    #[must_use]
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Validate the accumulated topology and produce an immutable compiled
    /// graph. This checks for a missing entry point, duplicate vertex ids,
    /// and edges naming
    /// unregistered vertices, returning a [`GraphBuildError`] for any of
    /// them; cycles and vertices unreachable from the entry point are
    /// reported as `tracing::warn!` diagnostics rather than errors, since
    /// a loop back to an earlier vertex is ordinary Pregel usage.
    pub fn compile(self) -> Result<CompiledGraph<S>, GraphBuildError> {
        let ids: Vec<VertexId> = self.vertices.iter().map(|v| v.id.clone()).collect();
        let duplicates = find_duplicates(&ids);

        validate::validate(&ids, &duplicates, &self.edges, self.entry.as_ref())?;

        let entry = self.entry.expect("checked by validate::validate");
        let mut vertices = FxHashMap::default();
        for vertex in self.vertices {
            vertices.insert(vertex.id.clone(), vertex);
        }

        Ok(CompiledGraph::new(
            vertices,
            self.edges,
            self.conditional_edges,
            entry,
            self.runtime_config,
        ))
    }
}

fn find_duplicates(ids: &[VertexId]) -> Vec<VertexId> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for id in ids {
        if !seen.insert(id) {
            duplicates.push(id.clone());
        }
    }
    duplicates
}
