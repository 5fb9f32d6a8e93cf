//! Typed payloads that flow between vertices across superstep barriers.
//!
//! A [`Message`] is always addressed to exactly one target [`VertexId`] and
//! carries a [`Payload`]. Messages sent during superstep *N* are queued by
//! the runtime and delivered at the start of superstep *N+1* — never within
//! the same superstep.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::VertexId;

/// The data carried by a [`Message`].
///
/// `Activate` is the payload router, fan-out, and barrier vertices use when
/// they only need to wake a target up without handing it data (the target's
/// `compute` reads whatever it needs from state). `Json` carries an
/// arbitrary structured value — tool results, sub-agent projections, or
/// application-defined data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Wake the target for the next superstep with no accompanying data.
    Activate,
    /// Arbitrary structured data.
    Json(Value),
}

impl Payload {
    /// Convenience constructor for a JSON payload from any `Serialize` value.
    pub fn json(value: impl Serialize) -> serde_json::Result<Self> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    /// Borrow the JSON value, if this payload carries one.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Activate => None,
        }
    }
}

/// A message in flight between two vertices, addressed to a single target.
///
/// `source` is the vertex that emitted the message, carried so fan-in
/// barriers can track which listed sources have reported in this superstep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub source: VertexId,
    pub target: VertexId,
    pub payload: Payload,
}

impl Message {
    /// Construct a new message from `source` to `target`.
    pub fn new(source: VertexId, target: VertexId, payload: Payload) -> Self {
        Self {
            source,
            target,
            payload,
        }
    }

    /// Construct an `Activate`-payload message.
    pub fn activate(source: VertexId, target: VertexId) -> Self {
        Self::new(source, target, Payload::Activate)
    }

    /// Construct a JSON-payload message.
    pub fn data(source: VertexId, target: VertexId, value: Value) -> Self {
        Self::new(source, target, Payload::Json(value))
    }
}
