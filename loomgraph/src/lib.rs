//! # loomgraph: a Pregel-style workflow execution engine
//!
//! loomgraph orchestrates graphs of heterogeneous compute nodes — LLM
//! agents, tool invocations, routers, fan-out/fan-in barriers, and
//! sub-workflow calls — under a deterministic superstep schedule with
//! durable checkpointing.
//!
//! ## Core concepts
//!
//! - **Vertices**: polymorphic compute units ([`vertex::VertexKind`]) that
//!   read a committed state snapshot and incoming messages, then emit a
//!   state update plus outgoing messages.
//! - **Messages**: typed payloads ([`message::Message`]) addressed to one
//!   target vertex, queued between supersteps and delivered at the start of
//!   the next.
//! - **State**: an application-defined [`state::WorkflowState`] paired with
//!   a commutative [`state::StateUpdate`], merged deterministically at each
//!   barrier.
//! - **Graph**: a [`graphs::GraphBuilder`] produces a validated, immutable
//!   [`graphs::CompiledGraph`].
//! - **Runtime**: [`runtimes::engine::Runtime`] drives the superstep loop,
//!   bounded-parallel vertex dispatch, message routing, termination
//!   detection, and checkpoint cadence.
//!
//! ## Quick start
//!
//! ```
//! use loomgraph::graphs::GraphBuilder;
//! use loomgraph::message::Message;
//! use loomgraph::runtimes::engine::Runtime;
//! use loomgraph::state::{JsonState, JsonUpdate};
//! use loomgraph::types::VertexId;
//! use loomgraph::vertex::transform::TransformConfig;
//! use loomgraph::vertex::{Vertex, VertexKind};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let a = Vertex::new(
//!     "a",
//!     VertexKind::Transform(TransformConfig::new(Arc::new(
//!         |_s: &JsonState, _m: &[Message]| JsonUpdate::set("value", serde_json::json!(1)),
//!     ))),
//! );
//!
//! let graph = GraphBuilder::new()
//!     .add_vertex(a)
//!     .entry("a")
//!     .add_edge("a", VertexId::end())
//!     .compile()
//!     .unwrap();
//!
//! let runtime = Runtime::new(graph);
//! let final_state = runtime.run(JsonState::empty()).await.unwrap();
//! assert_eq!(final_state.project()["value"], serde_json::json!(1));
//! # }
//! ```
//!
//! ## Module guide
//!
//! - [`types`] — [`types::VertexId`] and [`types::VertexState`]
//! - [`message`] — the typed payloads routed between vertices
//! - [`state`] — the [`state::WorkflowState`]/[`state::StateUpdate`] contract
//! - [`vertex`] — the vertex contract and the closed set of vertex kinds
//! - [`graphs`] — builder, validator, and compiled immutable graph
//! - [`schedulers`] — bounded-concurrency dispatch of one superstep's runnable set
//! - [`runtimes`] — the superstep loop, config, and checkpointing
//! - [`capabilities`] — the LLM provider / tool runtime seams consumed by vertices
//! - [`channels`] — the shared error envelope threaded through diagnostics
//! - [`event_bus`] — structured event emission and streaming sinks
//! - [`telemetry`] — rendering events/errors for human-facing output
//! - [`utils`] — id generation, retry/backoff, and JSON path helpers

pub mod capabilities;
pub mod channels;
pub mod event_bus;
pub mod graphs;
pub mod message;
pub mod runtimes;
pub mod schedulers;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod vertex;
