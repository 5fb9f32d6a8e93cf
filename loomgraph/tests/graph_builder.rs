//! Black-box coverage of `GraphBuilder::compile`'s structural validation,
//! exercised through the public API only.

use loomgraph::graphs::{GraphBuildError, GraphBuilder};
use loomgraph::message::Message;
use loomgraph::state::{JsonState, JsonUpdate};
use loomgraph::types::VertexId;
use loomgraph::vertex::transform::TransformConfig;
use loomgraph::vertex::{Vertex, VertexKind};
use std::sync::Arc;

fn noop(id: &str) -> Vertex<JsonState> {
    Vertex::new(
        id,
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, _m: &[Message]| JsonUpdate::empty(),
        ))),
    )
}

#[test]
fn a_well_formed_linear_graph_compiles() {
    let graph = GraphBuilder::new()
        .add_vertex(noop("plan"))
        .add_vertex(noop("act"))
        .entry("plan")
        .add_edge("plan", "act")
        .add_edge("act", VertexId::end())
        .compile();

    assert!(graph.is_ok());
    assert_eq!(graph.unwrap().vertex_count(), 2);
}

#[test]
fn missing_entry_point_is_rejected() {
    let err = GraphBuilder::<JsonState>::new()
        .add_vertex(noop("plan"))
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::NoEntryPoint));
}

#[test]
fn entry_naming_an_unregistered_vertex_is_rejected() {
    let err = GraphBuilder::<JsonState>::new()
        .add_vertex(noop("plan"))
        .entry("ghost")
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::UnknownEntryVertex(_)));
}

#[test]
fn an_edge_naming_an_unregistered_vertex_is_rejected() {
    let err = GraphBuilder::<JsonState>::new()
        .add_vertex(noop("plan"))
        .entry("plan")
        .add_edge("plan", "ghost")
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::UnknownVertex { .. }));
}

#[test]
fn duplicate_vertex_ids_are_rejected() {
    let err = GraphBuilder::<JsonState>::new()
        .add_vertex(noop("plan"))
        .add_vertex(noop("plan"))
        .entry("plan")
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::DuplicateVertex(_)));
}

#[test]
fn a_cycle_is_a_warning_not_a_compile_error() {
    // "act" loops back to "plan" — ordinary Pregel usage, not a defect.
    let graph = GraphBuilder::new()
        .add_vertex(noop("plan"))
        .add_vertex(noop("act"))
        .entry("plan")
        .add_edge("plan", "act")
        .add_edge("act", "plan")
        .compile();
    assert!(graph.is_ok());
}

#[test]
fn a_vertex_unreachable_from_entry_is_a_warning_not_a_compile_error() {
    let graph = GraphBuilder::new()
        .add_vertex(noop("plan"))
        .add_vertex(noop("orphan"))
        .entry("plan")
        .add_edge("plan", VertexId::end())
        .compile();
    assert!(graph.is_ok());
}
