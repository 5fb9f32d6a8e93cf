//! The embedded-SQL checkpointer backend: SQLite via `sqlx`, one row per
//! `(workflow_id, superstep)`, written inside a single transaction so
//! readers never observe a half-written checkpoint.
//!
//! A shared `SqlitePool`, `#[instrument]`ed operations, and JSON-blob
//! columns for the structured fields, kept to exactly the columns a
//! [`Checkpoint`] needs rather than a fuller step-history/pagination
//! schema.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::runtimes::checkpoint::Checkpoint;
use crate::state::WorkflowState;

use super::{Checkpointer, CheckpointerError, Result};

/// SQLite-backed [`Checkpointer`]. Every superstep's checkpoint is kept as
/// its own row until [`Checkpointer::prune`] removes it.
pub struct SqliteCheckpointer<S: WorkflowState> {
    pool: SqlitePool,
    _phantom: PhantomData<S>,
}

impl<S: WorkflowState> SqliteCheckpointer<S> {
    /// Connect to `database_url` (e.g. `sqlite://workflow.db` or
    /// `sqlite::memory:`), creating the checkpoint table if absent.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                workflow_id TEXT NOT NULL,
                superstep INTEGER NOT NULL,
                state_json TEXT NOT NULL,
                halt_map_json TEXT NOT NULL,
                queues_json TEXT NOT NULL,
                ts_utc TEXT NOT NULL,
                PRIMARY KEY (workflow_id, superstep)
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(Self {
            pool,
            _phantom: PhantomData,
        })
    }

    fn from_row(row: SqliteRowShim) -> Result<Checkpoint<S>> {
        let state = serde_json::from_str(&row.state_json)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;
        let halt_map = serde_json::from_str(&row.halt_map_json)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;
        let queues = serde_json::from_str(&row.queues_json)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;
        let ts_utc = row
            .ts_utc
            .parse()
            .map_err(|e: chrono::ParseError| CheckpointerError::backend(e.to_string()))?;
        Ok(Checkpoint {
            workflow_id: row.workflow_id,
            superstep: row.superstep as u64,
            state,
            halt_map,
            queues,
            ts_utc,
        })
    }
}

struct SqliteRowShim {
    workflow_id: String,
    superstep: i64,
    state_json: String,
    halt_map_json: String,
    queues_json: String,
    ts_utc: String,
}

impl SqliteRowShim {
    fn from_sqlx(row: &sqlx::sqlite::SqliteRow) -> Self {
        Self {
            workflow_id: row.get("workflow_id"),
            superstep: row.get("superstep"),
            state_json: row.get("state_json"),
            halt_map_json: row.get("halt_map_json"),
            queues_json: row.get("queues_json"),
            ts_utc: row.get("ts_utc"),
        }
    }
}

#[async_trait]
impl<S: WorkflowState> Checkpointer<S> for SqliteCheckpointer<S> {
    #[instrument(skip(self, checkpoint))]
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<()> {
        let state_json = serde_json::to_string(&checkpoint.state)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;
        let halt_map_json = serde_json::to_string(&checkpoint.halt_map)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;
        let queues_json = serde_json::to_string(&checkpoint.queues)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;

        sqlx::query(
            "INSERT INTO checkpoints
                (workflow_id, superstep, state_json, halt_map_json, queues_json, ts_utc)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(workflow_id, superstep) DO UPDATE SET
                state_json = excluded.state_json,
                halt_map_json = excluded.halt_map_json,
                queues_json = excluded.queues_json,
                ts_utc = excluded.ts_utc",
        )
        .bind(&checkpoint.workflow_id)
        .bind(checkpoint.superstep as i64)
        .bind(state_json)
        .bind(halt_map_json)
        .bind(queues_json)
        .bind(checkpoint.ts_utc.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(())
    }

    async fn load_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint<S>>> {
        let row = sqlx::query(
            "SELECT workflow_id, superstep, state_json, halt_map_json, queues_json, ts_utc
             FROM checkpoints WHERE workflow_id = ? ORDER BY superstep DESC LIMIT 1",
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        row.map(|r| Self::from_row(SqliteRowShim::from_sqlx(&r)))
            .transpose()
    }

    async fn load(&self, workflow_id: &str, superstep: u64) -> Result<Option<Checkpoint<S>>> {
        let row = sqlx::query(
            "SELECT workflow_id, superstep, state_json, halt_map_json, queues_json, ts_utc
             FROM checkpoints WHERE workflow_id = ? AND superstep = ?",
        )
        .bind(workflow_id)
        .bind(superstep as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        row.map(|r| Self::from_row(SqliteRowShim::from_sqlx(&r)))
            .transpose()
    }

    async fn list(&self, workflow_id: &str) -> Result<Vec<u64>> {
        let rows = sqlx::query("SELECT superstep FROM checkpoints WHERE workflow_id = ? ORDER BY superstep ASC")
            .bind(workflow_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get::<i64, _>("superstep") as u64).collect())
    }

    async fn prune(&self, workflow_id: &str, keep_count: usize) -> Result<()> {
        sqlx::query(
            "DELETE FROM checkpoints WHERE workflow_id = ? AND superstep NOT IN (
                SELECT superstep FROM checkpoints WHERE workflow_id = ?
                ORDER BY superstep DESC LIMIT ?
            )",
        )
        .bind(workflow_id)
        .bind(workflow_id)
        .bind(keep_count as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JsonState;
    use rustc_hash::FxHashMap;
    use serde_json::json;

    fn checkpoint(workflow_id: &str, superstep: u64) -> Checkpoint<JsonState> {
        Checkpoint::new(
            workflow_id,
            superstep,
            JsonState::new(json!({"superstep": superstep})),
            FxHashMap::default(),
            FxHashMap::default(),
        )
    }

    #[tokio::test]
    async fn save_then_load_round_trips_in_memory() {
        let checkpointer: SqliteCheckpointer<JsonState> =
            SqliteCheckpointer::connect("sqlite::memory:").await.unwrap();
        checkpointer.save(&checkpoint("wf", 2)).await.unwrap();
        let loaded = checkpointer.load("wf", 2).await.unwrap().unwrap();
        assert_eq!(loaded.state.project()["superstep"], json!(2));
    }

    #[tokio::test]
    async fn prune_keeps_only_the_most_recent_rows() {
        let checkpointer: SqliteCheckpointer<JsonState> =
            SqliteCheckpointer::connect("sqlite::memory:").await.unwrap();
        for step in 0..5 {
            checkpointer.save(&checkpoint("wf", step)).await.unwrap();
        }
        checkpointer.prune("wf", 2).await.unwrap();
        assert_eq!(checkpointer.list("wf").await.unwrap(), vec![3, 4]);
    }
}
