//! The durable snapshot a [`super::Checkpointer`] persists at a superstep
//! barrier.
//!
//! Carries exactly what resuming a run needs — `superstep`, `state`, a
//! per-vertex halt map, pending message queues keyed by target, and a
//! wall-clock timestamp — plus a `workflow_id` so multi-tenant backends
//! (Postgres upsert key, Redis key prefix) can address more than one run.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::state::WorkflowState;
use crate::types::{VertexId, VertexState};

/// `{ superstep, state, halt_map, queues, ts_utc }`, plus the
/// `workflow_id` a checkpointer backend addresses it by.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "S: WorkflowState")]
pub struct Checkpoint<S: WorkflowState> {
    pub workflow_id: String,
    pub superstep: u64,
    pub state: S,
    pub halt_map: FxHashMap<VertexId, VertexState>,
    pub queues: FxHashMap<VertexId, Vec<Message>>,
    pub ts_utc: DateTime<Utc>,
}

impl<S: WorkflowState> Checkpoint<S> {
    #[must_use]
    pub fn new(
        workflow_id: impl Into<String>,
        superstep: u64,
        state: S,
        halt_map: FxHashMap<VertexId, VertexState>,
        queues: FxHashMap<VertexId, Vec<Message>>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            superstep,
            state,
            halt_map,
            queues,
            ts_utc: Utc::now(),
        }
    }
}
