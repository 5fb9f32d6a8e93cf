//! The Pregel runtime: superstep loop, configuration, checkpointing.
//!
//! `engine.rs` and `config.rs` sit as siblings at this module's top level;
//! the checkpointer backends live under their own `checkpointer/`
//! submodule since there are several of them (file, SQLite, Postgres,
//! Redis) sharing one trait.

pub mod checkpoint;
pub mod checkpointer;
pub mod config;
pub mod engine;

pub use checkpoint::Checkpoint;
pub use checkpointer::{Checkpointer, CheckpointerError};
pub use config::RuntimeConfig;
pub use engine::{Runtime, WorkflowError};
