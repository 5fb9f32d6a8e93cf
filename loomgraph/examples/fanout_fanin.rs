//! A fan-out/fan-in barrier: two workers run concurrently within a
//! superstep and a barrier vertex waits for both before continuing.
//!
//! Run with: `cargo run --example fanout_fanin`

use loomgraph::graphs::GraphBuilder;
use loomgraph::message::Message;
use loomgraph::runtimes::engine::Runtime;
use loomgraph::state::{JsonState, JsonUpdate};
use loomgraph::types::VertexId;
use loomgraph::vertex::fanin::{FanInConfig, FanInMergeStrategy};
use loomgraph::vertex::fanout::{FanOutConfig, SplitStrategy};
use loomgraph::vertex::transform::TransformConfig;
use loomgraph::vertex::{Vertex, VertexKind};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // An entry vertex is needed to wake the fan-out: `FanOut` only reacts
    // to an inbound message, and entry vertices start with none.
    let seed = Vertex::new(
        "seed",
        VertexKind::Transform(
            TransformConfig::new(Arc::new(|_s: &JsonState, _m: &[Message]| JsonUpdate::empty()))
                .forward_to("split"),
        ),
    );
    let split = Vertex::new(
        "split",
        VertexKind::FanOut(FanOutConfig::new(
            vec![VertexId::new("fetch_weather"), VertexId::new("fetch_news")],
            SplitStrategy::Broadcast,
        )),
    );
    let fetch_weather = Vertex::new(
        "fetch_weather",
        VertexKind::Transform(
            TransformConfig::new(Arc::new(|_s: &JsonState, _m: &[Message]| {
                JsonUpdate::set("weather", json!("sunny"))
            }))
            .forward_to("join"),
        ),
    );
    let fetch_news = Vertex::new(
        "fetch_news",
        VertexKind::Transform(
            TransformConfig::new(Arc::new(|_s: &JsonState, _m: &[Message]| {
                JsonUpdate::set("news", json!(["launch delayed", "markets up"]))
            }))
            .forward_to("join"),
        ),
    );
    let join = Vertex::new(
        "join",
        VertexKind::FanIn(FanInConfig::new(
            vec![VertexId::new("fetch_weather"), VertexId::new("fetch_news")],
            FanInMergeStrategy::Collect,
            VertexId::end(),
        )),
    );

    let graph = GraphBuilder::new()
        .add_vertex(seed)
        .add_vertex(split)
        .add_vertex(fetch_weather)
        .add_vertex(fetch_news)
        .add_vertex(join)
        .entry("seed")
        .add_edge("seed", "split")
        .add_edge("split", "fetch_weather")
        .add_edge("split", "fetch_news")
        .add_edge("fetch_weather", "join")
        .add_edge("fetch_news", "join")
        .add_edge("join", VertexId::end())
        .compile()
        .expect("graph is well-formed");

    let runtime = Runtime::new(graph);
    let final_state = runtime
        .run(JsonState::empty())
        .await
        .expect("workflow completes within the superstep budget");

    println!("{}", final_state.project());
}
