//! Round-trip coverage for the local-file checkpointer backend, exercised
//! through the public `Checkpointer` trait against a real temp directory.

use loomgraph::message::Message;
use loomgraph::runtimes::checkpoint::Checkpoint;
use loomgraph::runtimes::checkpointer::{Checkpointer, FileCheckpointer};
use loomgraph::state::JsonState;
use loomgraph::types::{VertexId, VertexState};
use rustc_hash::FxHashMap;
use serde_json::json;

fn sample_checkpoint(workflow_id: &str, superstep: u64) -> Checkpoint<JsonState> {
    let mut halt_map = FxHashMap::default();
    halt_map.insert(VertexId::new("a"), VertexState::Halted);
    let mut queues = FxHashMap::default();
    queues.insert(
        VertexId::new("b"),
        vec![Message::activate(VertexId::new("a"), VertexId::new("b"))],
    );
    Checkpoint::new(
        workflow_id,
        superstep,
        JsonState::new(json!({"count": superstep})),
        halt_map,
        queues,
    )
}

#[tokio::test]
async fn save_then_load_latest_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer: FileCheckpointer<JsonState> = FileCheckpointer::new(dir.path());

    checkpointer.save(&sample_checkpoint("wf-1", 1)).await.unwrap();
    checkpointer.save(&sample_checkpoint("wf-1", 2)).await.unwrap();

    let latest = checkpointer.load_latest("wf-1").await.unwrap().unwrap();
    assert_eq!(latest.superstep, 2);
    assert_eq!(latest.state.0["count"], json!(2));
    assert_eq!(latest.halt_map[&VertexId::new("a")], VertexState::Halted);
    assert_eq!(latest.queues[&VertexId::new("b")].len(), 1);
}

#[tokio::test]
async fn load_returns_none_for_a_pruned_or_missing_superstep() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer: FileCheckpointer<JsonState> = FileCheckpointer::new(dir.path());
    checkpointer.save(&sample_checkpoint("wf-2", 1)).await.unwrap();

    assert!(checkpointer.load("wf-2", 7).await.unwrap().is_none());
    assert!(checkpointer.load("wf-2", 1).await.unwrap().is_some());
}

#[tokio::test]
async fn list_returns_every_retained_superstep_ascending() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer: FileCheckpointer<JsonState> = FileCheckpointer::new(dir.path());
    for step in [3, 1, 2] {
        checkpointer.save(&sample_checkpoint("wf-3", step)).await.unwrap();
    }
    assert_eq!(checkpointer.list("wf-3").await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn prune_keeps_only_the_most_recent_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer: FileCheckpointer<JsonState> = FileCheckpointer::new(dir.path());
    for step in 1..=5 {
        checkpointer.save(&sample_checkpoint("wf-4", step)).await.unwrap();
    }
    checkpointer.prune("wf-4", 2).await.unwrap();
    assert_eq!(checkpointer.list("wf-4").await.unwrap(), vec![4, 5]);
}

#[tokio::test]
async fn separate_workflow_ids_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer: FileCheckpointer<JsonState> = FileCheckpointer::new(dir.path());
    checkpointer.save(&sample_checkpoint("wf-a", 1)).await.unwrap();
    checkpointer.save(&sample_checkpoint("wf-b", 1)).await.unwrap();

    assert_eq!(checkpointer.list("wf-a").await.unwrap(), vec![1]);
    assert_eq!(checkpointer.list("wf-b").await.unwrap(), vec![1]);
}
