//! The remote key-value checkpointer backend: Redis, with a pipelined
//! `SET` of the checkpoint blob plus a sorted-set index of known
//! supersteps, and an optional `EXPIRE` TTL.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::runtimes::checkpoint::Checkpoint;
use crate::state::WorkflowState;

use super::{Checkpointer, CheckpointerError, Result};

/// Redis-backed [`Checkpointer`].
///
/// Each checkpoint is stored under `loomgraph:{workflow_id}:checkpoint:{superstep}`;
/// a sorted set at `loomgraph:{workflow_id}:index` (score = superstep) tracks
/// which supersteps exist so [`Checkpointer::list`]/[`Checkpointer::prune`]
/// don't need a Redis `KEYS` scan.
pub struct RedisCheckpointer<S: WorkflowState> {
    client: redis::Client,
    ttl: Option<Duration>,
    _phantom: PhantomData<S>,
}

impl<S: WorkflowState> RedisCheckpointer<S> {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client =
            redis::Client::open(redis_url).map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(Self {
            client,
            ttl: None,
            _phantom: PhantomData,
        })
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))
    }

    fn checkpoint_key(workflow_id: &str, superstep: u64) -> String {
        format!("loomgraph:{workflow_id}:checkpoint:{superstep}")
    }

    fn index_key(workflow_id: &str) -> String {
        format!("loomgraph:{workflow_id}:index")
    }
}

#[async_trait]
impl<S: WorkflowState> Checkpointer<S> for RedisCheckpointer<S> {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<()> {
        let blob = serde_json::to_string(checkpoint)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;
        let mut conn = self.connection().await?;
        let key = Self::checkpoint_key(&checkpoint.workflow_id, checkpoint.superstep);
        let index_key = Self::index_key(&checkpoint.workflow_id);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(&key, &blob)
            .ignore()
            .zadd(&index_key, checkpoint.superstep, checkpoint.superstep as f64)
            .ignore();
        if let Some(ttl) = self.ttl {
            pipe.expire(&key, ttl.as_secs() as i64).ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(())
    }

    async fn load_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint<S>>> {
        let mut conn = self.connection().await?;
        let index_key = Self::index_key(workflow_id);
        let latest: Vec<u64> = conn
            .zrevrange(&index_key, 0, 0)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        match latest.first() {
            Some(&superstep) => self.load(workflow_id, superstep).await,
            None => Ok(None),
        }
    }

    async fn load(&self, workflow_id: &str, superstep: u64) -> Result<Option<Checkpoint<S>>> {
        let mut conn = self.connection().await?;
        let key = Self::checkpoint_key(workflow_id, superstep);
        let blob: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        blob.map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })
        })
        .transpose()
    }

    async fn list(&self, workflow_id: &str) -> Result<Vec<u64>> {
        let mut conn = self.connection().await?;
        let index_key = Self::index_key(workflow_id);
        conn.zrange(&index_key, 0, -1)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))
    }

    async fn prune(&self, workflow_id: &str, keep_count: usize) -> Result<()> {
        let mut conn = self.connection().await?;
        let index_key = Self::index_key(workflow_id);
        let all: Vec<u64> = conn
            .zrevrange(&index_key, 0, -1)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        let stale = &all[all.len().min(keep_count)..];
        if stale.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for &superstep in stale {
            pipe.del(Self::checkpoint_key(workflow_id, superstep)).ignore();
            pipe.zrem(&index_key, superstep).ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Exercised against a real Redis instance in CI only; there is no
    //! in-memory Redis analogous to SQLite's `sqlite::memory:`.
    use super::*;

    #[test]
    fn checkpointer_is_send_and_sync() {
        fn assert_bounds<T: Send + Sync>() {}
        assert_bounds::<RedisCheckpointer<crate::state::JsonState>>();
    }
}
