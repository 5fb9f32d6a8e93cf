//! The FanIn vertex: a barrier that waits for every listed source to
//! report before merging their payloads and forwarding the result.
//!
//! An interior `Mutex`-guarded accumulator lets the vertex stay `Active`
//! across supersteps while it waits for the remaining sources to report.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::message::Payload;
use crate::state::{StateUpdate, WorkflowState};
use crate::types::VertexId;
use crate::utils::json_ext::{self, MergeStrategy};

use super::{VertexContext, VertexError, VertexOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FanInMergeStrategy {
    /// Collect every payload into a JSON array, in arrival order.
    Collect,
    /// Keep only the first payload received.
    First,
    /// Keep only the last payload received.
    Last,
    /// Join string payloads with newlines.
    Concat,
    /// Deep-merge object payloads into one.
    Merge,
}

#[derive(Clone, Debug)]
pub struct FanInConfig {
    pub sources: Vec<VertexId>,
    pub merge_strategy: FanInMergeStrategy,
    pub output_target: VertexId,
    received: Arc<Mutex<Vec<(VertexId, Value)>>>,
}

impl FanInConfig {
    #[must_use]
    pub fn new(
        sources: Vec<VertexId>,
        merge_strategy: FanInMergeStrategy,
        output_target: impl Into<VertexId>,
    ) -> Self {
        Self {
            sources,
            merge_strategy,
            output_target: output_target.into(),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn merge(&self, values: Vec<Value>) -> Value {
        match self.merge_strategy {
            FanInMergeStrategy::Collect => Value::Array(values),
            FanInMergeStrategy::First => values.into_iter().next().unwrap_or(Value::Null),
            FanInMergeStrategy::Last => values.into_iter().next_back().unwrap_or(Value::Null),
            FanInMergeStrategy::Concat => {
                let joined = values
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join("\n");
                Value::String(joined)
            }
            FanInMergeStrategy::Merge => {
                let mut acc = Value::Object(serde_json::Map::new());
                for value in values {
                    acc = json_ext::deep_merge(&acc, &value, MergeStrategy::DeepMerge)
                        .unwrap_or(acc);
                }
                acc
            }
        }
    }
}

pub(super) async fn compute<S: WorkflowState>(
    cfg: &FanInConfig,
    ctx: &mut VertexContext<'_, S>,
) -> Result<VertexOutcome<S::Update>, VertexError> {
    let mut received = cfg.received.lock().map_err(|_| {
        VertexError::new(ctx.id.clone(), ctx.superstep, "fan-in accumulator lock poisoned")
    })?;

    for msg in &ctx.messages {
        let value = msg.payload.as_json().cloned().unwrap_or(Value::Null);
        received.push((msg.source.clone(), value));
    }

    let arrived: HashSet<&VertexId> = received.iter().map(|(src, _)| src).collect();
    let ready = cfg.sources.is_empty() || cfg.sources.iter().all(|s| arrived.contains(s));

    if ready && !received.is_empty() {
        let values: Vec<Value> = std::mem::take(&mut *received)
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        drop(received);
        let merged = cfg.merge(values);
        ctx.send(cfg.output_target.clone(), Payload::Json(merged));
        Ok(VertexOutcome::halted(S::Update::empty()))
    } else {
        Ok(VertexOutcome::active(S::Update::empty()))
    }
}
