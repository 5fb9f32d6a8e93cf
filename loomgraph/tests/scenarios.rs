//! End-to-end superstep-execution scenarios driven through the public
//! `GraphBuilder`/`Runtime` API: router dispatch, a fan-out/fan-in barrier,
//! and the max-supersteps fence, combined into graphs the in-crate unit
//! tests don't already cover in this shape.

use loomgraph::graphs::GraphBuilder;
use loomgraph::message::Message;
use loomgraph::runtimes::config::RuntimeConfig;
use loomgraph::runtimes::engine::{Runtime, WorkflowError};
use loomgraph::state::{JsonState, JsonUpdate, StateUpdate};
use loomgraph::types::VertexId;
use loomgraph::vertex::fanin::{FanInConfig, FanInMergeStrategy};
use loomgraph::vertex::fanout::{FanOutConfig, SplitStrategy};
use loomgraph::vertex::router::{Branch, BranchCondition, RouterConfig};
use loomgraph::vertex::transform::TransformConfig;
use loomgraph::vertex::{Vertex, VertexKind};
use serde_json::json;
use std::sync::Arc;

fn counting_update(count: i64) -> JsonUpdate {
    JsonUpdate::set("count", json!(count))
}

#[tokio::test]
async fn router_dispatches_to_the_matching_branch_then_terminates() {
    // start -> router -> {explorer | END}, state_field routing on "phase".
    let start = Vertex::new(
        "start",
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, _m: &[Message]| JsonUpdate::set("phase", json!("explore")),
        )))
        .forward_to("router"),
    );
    let router = Vertex::new(
        "router",
        VertexKind::Router(RouterConfig::state_field(
            "phase",
            vec![Branch::new(
                BranchCondition::Equals(json!("explore")),
                VertexId::new("explorer"),
            )],
            Some(VertexId::end()),
        )),
    );
    let explorer = Vertex::new(
        "explorer",
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, _m: &[Message]| JsonUpdate::set("visited", json!(true)),
        ))),
    );

    let graph = GraphBuilder::new()
        .add_vertex(start)
        .add_vertex(router)
        .add_vertex(explorer)
        .entry("start")
        .add_edge("start", "router")
        .add_edge("router", "explorer")
        .add_edge("router", VertexId::end())
        .add_edge("explorer", VertexId::end())
        .compile()
        .unwrap();

    let runtime = Runtime::new(graph);
    let final_state = runtime.run(JsonState::empty()).await.unwrap();
    let projected = final_state.project();
    assert_eq!(projected["phase"], json!("explore"));
    assert_eq!(projected["visited"], json!(true));
}

#[tokio::test]
async fn fanout_then_fanin_barrier_waits_for_every_worker_before_continuing() {
    // seed -> split -> {worker_a, worker_b} -> fanin -> done
    //
    // FanOut only broadcasts in reaction to an inbound message, so a
    // standalone "seed" entry vertex wakes it up; `split` itself can't be
    // the entry point since entry vertices run their first superstep with
    // no inbound messages.
    let seed = Vertex::new(
        "seed",
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, _m: &[Message]| JsonUpdate::empty(),
        )))
        .forward_to("split"),
    );
    let split = Vertex::new(
        "split",
        VertexKind::FanOut(FanOutConfig::new(
            vec![VertexId::new("worker_a"), VertexId::new("worker_b")],
            SplitStrategy::Broadcast,
        )),
    );
    let worker_a = Vertex::new(
        "worker_a",
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, _m: &[Message]| counting_update(1),
        )))
        .forward_to("fanin"),
    );
    let worker_b = Vertex::new(
        "worker_b",
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, _m: &[Message]| counting_update(2),
        )))
        .forward_to("fanin"),
    );
    let fanin = Vertex::new(
        "fanin",
        VertexKind::FanIn(FanInConfig::new(
            vec![VertexId::new("worker_a"), VertexId::new("worker_b")],
            FanInMergeStrategy::Collect,
            VertexId::new("done"),
        )),
    );
    let done = Vertex::new(
        "done",
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, m: &[Message]| {
                let arrived = m.first().and_then(|msg| msg.payload.as_json()).cloned();
                JsonUpdate::set("collected", arrived.unwrap_or(json!(null)))
            },
        ))),
    );

    let graph = GraphBuilder::new()
        .add_vertex(seed)
        .add_vertex(split)
        .add_vertex(worker_a)
        .add_vertex(worker_b)
        .add_vertex(fanin)
        .add_vertex(done)
        .entry("seed")
        .add_edge("seed", "split")
        .add_edge("split", "worker_a")
        .add_edge("split", "worker_b")
        .add_edge("worker_a", "fanin")
        .add_edge("worker_b", "fanin")
        .add_edge("fanin", "done")
        .add_edge("done", VertexId::end())
        .compile()
        .unwrap();

    let runtime = Runtime::new(graph);
    let final_state = runtime.run(JsonState::empty()).await.unwrap();

    // The barrier only forwards once both "worker_a" and "worker_b" have
    // reported, so "done" only ever sees a two-element collection.
    let collected = final_state.project()["collected"].clone();
    assert_eq!(collected.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn never_halting_vertex_is_fenced_by_max_supersteps() {
    let looping = Vertex::new(
        "looping",
        VertexKind::Transform(
            TransformConfig::new(Arc::new(|_s: &JsonState, _m: &[Message]| {
                JsonUpdate::empty()
            }))
            .forward_to("looping"),
        ),
    );

    let graph = GraphBuilder::new()
        .add_vertex(looping)
        .entry("looping")
        .add_edge("looping", "looping")
        .with_runtime_config(RuntimeConfig::default().with_max_supersteps(3))
        .compile()
        .unwrap();

    let runtime = Runtime::new(graph);
    let err = runtime.run(JsonState::empty()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::MaxSuperstepsExceeded(3)));
}
