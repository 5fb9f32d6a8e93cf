//! Round-trip coverage for the embedded-SQL checkpointer backend against an
//! in-memory SQLite database.

#![cfg(feature = "sqlite")]

use loomgraph::runtimes::checkpoint::Checkpoint;
use loomgraph::runtimes::checkpointer::{Checkpointer, SqliteCheckpointer};
use loomgraph::state::JsonState;
use loomgraph::types::{VertexId, VertexState};
use rustc_hash::FxHashMap;
use serde_json::json;

fn sample_checkpoint(workflow_id: &str, superstep: u64) -> Checkpoint<JsonState> {
    let mut halt_map = FxHashMap::default();
    halt_map.insert(VertexId::new("router"), VertexState::Active);
    Checkpoint::new(
        workflow_id,
        superstep,
        JsonState::new(json!({"step": superstep})),
        halt_map,
        FxHashMap::default(),
    )
}

#[tokio::test]
async fn save_then_load_latest_round_trips_through_sqlite() {
    let checkpointer: SqliteCheckpointer<JsonState> =
        SqliteCheckpointer::connect("sqlite::memory:").await.unwrap();

    checkpointer.save(&sample_checkpoint("wf", 1)).await.unwrap();
    checkpointer.save(&sample_checkpoint("wf", 2)).await.unwrap();

    let latest = checkpointer.load_latest("wf").await.unwrap().unwrap();
    assert_eq!(latest.superstep, 2);
    assert_eq!(latest.state.0["step"], json!(2));
    assert_eq!(latest.halt_map[&VertexId::new("router")], VertexState::Active);
}

#[tokio::test]
async fn upserting_the_same_superstep_overwrites_rather_than_duplicating() {
    let checkpointer: SqliteCheckpointer<JsonState> =
        SqliteCheckpointer::connect("sqlite::memory:").await.unwrap();

    checkpointer.save(&sample_checkpoint("wf", 1)).await.unwrap();
    checkpointer
        .save(&Checkpoint::new(
            "wf",
            1,
            JsonState::new(json!({"step": "overwritten"})),
            FxHashMap::default(),
            FxHashMap::default(),
        ))
        .await
        .unwrap();

    assert_eq!(checkpointer.list("wf").await.unwrap(), vec![1]);
    let loaded = checkpointer.load("wf", 1).await.unwrap().unwrap();
    assert_eq!(loaded.state.0["step"], json!("overwritten"));
}

#[tokio::test]
async fn load_latest_is_none_for_an_unknown_workflow() {
    let checkpointer: SqliteCheckpointer<JsonState> =
        SqliteCheckpointer::connect("sqlite::memory:").await.unwrap();
    assert!(checkpointer.load_latest("nonexistent").await.unwrap().is_none());
}
