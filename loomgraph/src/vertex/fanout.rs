//! The FanOut vertex: dispatches incoming messages to several targets by
//! broadcast, round-robin, or by splitting an array payload across them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::message::Payload;
use crate::state::{StateUpdate, WorkflowState};
use crate::types::VertexId;
use crate::utils::json_ext;

use super::{VertexContext, VertexError, VertexOutcome};

#[derive(Clone, Debug)]
pub enum SplitStrategy {
    /// Send every message to every target.
    Broadcast,
    /// Send each message to the next target in rotation.
    RoundRobin,
    /// Treat the payload (or a path within it) as an array and distribute
    /// its elements across targets round-robin.
    Split { path: Option<String> },
}

#[derive(Clone, Debug)]
pub struct FanOutConfig {
    pub targets: Vec<VertexId>,
    pub strategy: SplitStrategy,
    /// Dotted path into the committed state to read from when this vertex
    /// activates with no incoming message — the case when FanOut is the
    /// graph's entry vertex and there is no upstream message to react to.
    /// Ignored once any message has arrived; message payloads still take
    /// priority over this fallback.
    pub state_source: Option<String>,
    counter: Arc<AtomicUsize>,
}

impl FanOutConfig {
    #[must_use]
    pub fn new(targets: Vec<VertexId>, strategy: SplitStrategy) -> Self {
        Self {
            targets,
            strategy,
            state_source: None,
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Read the split/broadcast source from `path` in the committed state
    /// when this vertex runs with no incoming message (e.g. as the entry
    /// vertex of a graph).
    #[must_use]
    pub fn with_state_source(mut self, path: impl Into<String>) -> Self {
        self.state_source = Some(path.into());
        self
    }

    fn next_target(&self) -> Option<VertexId> {
        if self.targets.is_empty() {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % self.targets.len();
        Some(self.targets[idx].clone())
    }
}

fn dispatch<S: WorkflowState>(cfg: &FanOutConfig, ctx: &mut VertexContext<'_, S>, payload: &Payload) {
    match &cfg.strategy {
        SplitStrategy::Broadcast => {
            for target in &cfg.targets {
                ctx.send(target.clone(), payload.clone());
            }
        }
        SplitStrategy::RoundRobin => {
            if let Some(target) = cfg.next_target() {
                ctx.send(target, payload.clone());
            }
        }
        SplitStrategy::Split { path } => {
            let items = payload.as_json().and_then(|value| match path {
                Some(p) => json_ext::get_by_path(value, p).cloned(),
                None => Some(value.clone()),
            });
            match items {
                Some(Value::Array(items)) => {
                    for (i, item) in items.into_iter().enumerate() {
                        let target = cfg.targets[i % cfg.targets.len()].clone();
                        ctx.send(target, Payload::Json(item));
                    }
                }
                _ => {
                    for target in &cfg.targets {
                        ctx.send(target.clone(), payload.clone());
                    }
                }
            }
        }
    }
}

pub(super) async fn compute<S: WorkflowState>(
    cfg: &FanOutConfig,
    ctx: &mut VertexContext<'_, S>,
) -> Result<VertexOutcome<S::Update>, VertexError> {
    if cfg.targets.is_empty() {
        return Ok(VertexOutcome::halted(S::Update::empty()));
    }

    if ctx.messages.is_empty() {
        if let Some(path) = cfg.state_source.clone() {
            let projected = ctx.state.project();
            let value = json_ext::get_by_path(&projected, &path).cloned();
            if let Some(value) = value {
                dispatch(cfg, ctx, &Payload::Json(value));
            }
        }
        return Ok(VertexOutcome::halted(S::Update::empty()));
    }

    for msg in ctx.messages.clone() {
        dispatch(cfg, ctx, &msg.payload);
    }

    Ok(VertexOutcome::halted(S::Update::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventHub;
    use crate::message::Message;
    use crate::state::JsonState;
    use crate::vertex::IsolationContext;
    use serde_json::json;

    fn ctx_with<'a>(state: &'a JsonState, messages: Vec<Message>) -> VertexContext<'a, JsonState> {
        let hub = EventHub::new(4);
        VertexContext::new(
            VertexId::new("fanout"),
            0,
            state,
            messages,
            None,
            None,
            IsolationContext::default(),
            Arc::new(hub.emitter()),
        )
    }

    #[tokio::test]
    async fn broadcast_sends_to_every_target() {
        let cfg = FanOutConfig::new(
            vec![VertexId::new("a"), VertexId::new("b")],
            SplitStrategy::Broadcast,
        );
        let state = JsonState::empty();
        let msg = Message::data(VertexId::new("src"), VertexId::new("fanout"), json!(1));
        let mut ctx = ctx_with(&state, vec![msg]);
        compute(&cfg, &mut ctx).await.unwrap();
        let outbox = ctx.into_outbox();
        assert_eq!(outbox.len(), 2);
    }

    #[tokio::test]
    async fn split_distributes_array_items_round_robin() {
        let cfg = FanOutConfig::new(
            vec![VertexId::new("a"), VertexId::new("b")],
            SplitStrategy::Split { path: Some("items".into()) },
        );
        let state = JsonState::empty();
        let msg = Message::data(
            VertexId::new("src"),
            VertexId::new("fanout"),
            json!({"items": [1, 2, 3, 4]}),
        );
        let mut ctx = ctx_with(&state, vec![msg]);
        compute(&cfg, &mut ctx).await.unwrap();
        let outbox = ctx.into_outbox();
        assert_eq!(outbox.len(), 4);
        assert_eq!(outbox.iter().filter(|m| m.target == VertexId::new("a")).count(), 2);
    }

    #[tokio::test]
    async fn state_source_dispatches_when_no_message_has_arrived() {
        let cfg = FanOutConfig::new(
            vec![VertexId::new("w1"), VertexId::new("w2"), VertexId::new("w3")],
            SplitStrategy::Split { path: None },
        )
        .with_state_source("split");
        let state = JsonState::new(json!({"split": [10, 20, 30]}));
        let mut ctx = ctx_with(&state, vec![]);
        compute(&cfg, &mut ctx).await.unwrap();
        let outbox = ctx.into_outbox();
        assert_eq!(outbox.len(), 3);
        assert_eq!(outbox[0].target, VertexId::new("w1"));
        assert_eq!(outbox[0].payload.as_json(), Some(&json!(10)));
    }

    #[tokio::test]
    async fn no_state_source_and_no_message_dispatches_nothing() {
        let cfg = FanOutConfig::new(vec![VertexId::new("w1")], SplitStrategy::Broadcast);
        let state = JsonState::empty();
        let mut ctx = ctx_with(&state, vec![]);
        compute(&cfg, &mut ctx).await.unwrap();
        assert!(ctx.into_outbox().is_empty());
    }
}
