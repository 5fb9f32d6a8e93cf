//! The `Checkpointer` trait and its four backends.
//!
//! Beyond `save`/`load_latest`, the trait exposes `load(superstep)`,
//! `list()`, and `prune(keep_count)` so a backend can retain more than just
//! the latest checkpoint per run and callers can inspect or trim history.

pub mod file;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis-checkpointer")]
pub mod redis;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::runtimes::checkpoint::Checkpoint;
use crate::state::WorkflowState;

pub use file::FileCheckpointer;
#[cfg(feature = "postgres")]
pub use postgres::PostgresCheckpointer;
#[cfg(feature = "redis-checkpointer")]
pub use redis::RedisCheckpointer;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCheckpointer;

/// Errors from checkpointer operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("no checkpoint found for workflow '{workflow_id}'")]
    #[diagnostic(code(loomgraph::checkpointer::not_found))]
    NotFound { workflow_id: String },

    #[error("checkpointer backend error: {message}")]
    #[diagnostic(code(loomgraph::checkpointer::backend))]
    Backend { message: String },

    #[error("checkpoint serialization error: {message}")]
    #[diagnostic(code(loomgraph::checkpointer::serialization))]
    Serialization { message: String },
}

impl CheckpointerError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Durable snapshot storage and retrieval for one Pregel run.
///
/// Implementations must be atomic with respect to partial failure (readers
/// never observe a half-written checkpoint) and safe for concurrent use
/// across async tasks.
#[async_trait]
pub trait Checkpointer<S: WorkflowState>: Send + Sync {
    /// Persist `checkpoint`, replacing nothing — every superstep's
    /// checkpoint is retained until [`Checkpointer::prune`] removes it.
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<()>;

    /// Load the most recently saved checkpoint for `workflow_id`.
    async fn load_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint<S>>>;

    /// Load the checkpoint at exactly `superstep`. A pruned step returns
    /// `Ok(None)`, not an error.
    async fn load(&self, workflow_id: &str, superstep: u64) -> Result<Option<Checkpoint<S>>>;

    /// List every superstep with a retained checkpoint for `workflow_id`,
    /// ascending.
    async fn list(&self, workflow_id: &str) -> Result<Vec<u64>>;

    /// Keep only the `keep_count` most recent checkpoints for `workflow_id`,
    /// discarding older ones.
    async fn prune(&self, workflow_id: &str, keep_count: usize) -> Result<()>;
}
