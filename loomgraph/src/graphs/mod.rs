//! Graph construction: a fluent builder over [`crate::vertex::Vertex`]s and
//! edges, compiled into an immutable, validated [`CompiledGraph`].
//!
//! Follows a `builder -> compile -> immutable graph` shape, generalized
//! over [`crate::state::WorkflowState`] and the closed
//! [`crate::vertex::VertexKind`] enum, with real structural validation in
//! `compile()` rather than treating it as a bare constructor.

mod builder;
mod compiled;
mod edges;
mod validate;

pub use builder::GraphBuilder;
pub use compiled::CompiledGraph;
pub use edges::{ConditionalEdge, EdgePredicate};
pub use validate::GraphBuildError;
