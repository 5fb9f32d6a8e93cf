//! A three-stage linear pipeline of `Transform` vertices: each superstep one
//! vertex runs, mutates disjoint state keys, and forwards to the next.
//!
//! Run with: `cargo run --example linear_pipeline`

use loomgraph::graphs::GraphBuilder;
use loomgraph::message::Message;
use loomgraph::runtimes::engine::Runtime;
use loomgraph::state::{JsonState, JsonUpdate};
use loomgraph::types::VertexId;
use loomgraph::vertex::transform::TransformConfig;
use loomgraph::vertex::{Vertex, VertexKind};
use serde_json::json;
use std::sync::Arc;

fn stage(id: &'static str, key: &'static str, next: Option<&'static str>) -> Vertex<JsonState> {
    let mut config = TransformConfig::new(Arc::new(move |_s: &JsonState, _m: &[Message]| {
        JsonUpdate::set(key, json!(true))
    }));
    if let Some(next) = next {
        config = config.forward_to(next);
    }
    Vertex::new(id, VertexKind::Transform(config))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let graph = GraphBuilder::new()
        .add_vertex(stage("fetch", "fetched", Some("parse")))
        .add_vertex(stage("parse", "parsed", Some("summarize")))
        .add_vertex(stage("summarize", "summarized", None))
        .entry("fetch")
        .add_edge("fetch", "parse")
        .add_edge("parse", "summarize")
        .add_edge("summarize", VertexId::end())
        .compile()
        .expect("graph is well-formed");

    let runtime = Runtime::new(graph);
    let final_state = runtime
        .run(JsonState::empty())
        .await
        .expect("workflow completes within the superstep budget");

    println!("{}", final_state.project());
}
