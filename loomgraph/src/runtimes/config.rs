//! Runtime configuration, with `dotenvy`-sourced overrides for backend
//! connection strings.
//!
//! Builder-style `with_*` methods over a `dotenvy::dotenv().ok()` +
//! `std::env::var` fallback, covering the three backend URLs a
//! `loomgraph` runtime may need.

use std::time::Duration;

use crate::utils::retry::RetryPolicy;

fn env_override(key: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var(key).ok()
}

/// Configuration for a [`super::Runtime`], with spec-mandated defaults.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub max_supersteps: u64,
    pub parallelism: usize,
    /// Checkpoint every `checkpoint_interval` supersteps; `0` disables
    /// periodic checkpointing.
    pub checkpoint_interval: u64,
    pub vertex_timeout: Duration,
    pub workflow_timeout: Duration,
    pub retry_policy: RetryPolicy,
    pub tracing_enabled: bool,
    pub sqlite_url: Option<String>,
    pub postgres_url: Option<String>,
    pub redis_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_supersteps: 100,
            parallelism: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
            checkpoint_interval: 10,
            vertex_timeout: Duration::from_secs(5 * 60),
            workflow_timeout: Duration::from_secs(60 * 60),
            retry_policy: RetryPolicy::default(),
            tracing_enabled: true,
            sqlite_url: env_override("LOOMGRAPH_SQLITE_URL"),
            postgres_url: env_override("LOOMGRAPH_POSTGRES_URL"),
            redis_url: env_override("LOOMGRAPH_REDIS_URL"),
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_supersteps(mut self, max_supersteps: u64) -> Self {
        self.max_supersteps = max_supersteps;
        self
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    #[must_use]
    pub fn with_checkpoint_interval(mut self, checkpoint_interval: u64) -> Self {
        self.checkpoint_interval = checkpoint_interval;
        self
    }

    #[must_use]
    pub fn with_vertex_timeout(mut self, vertex_timeout: Duration) -> Self {
        self.vertex_timeout = vertex_timeout;
        self
    }

    #[must_use]
    pub fn with_workflow_timeout(mut self, workflow_timeout: Duration) -> Self {
        self.workflow_timeout = workflow_timeout;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[must_use]
    pub fn with_sqlite_url(mut self, url: impl Into<String>) -> Self {
        self.sqlite_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_postgres_url(mut self, url: impl Into<String>) -> Self {
        self.postgres_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_configuration_record() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_supersteps, 100);
        assert_eq!(config.checkpoint_interval, 10);
        assert_eq!(config.vertex_timeout, Duration::from_secs(300));
        assert_eq!(config.workflow_timeout, Duration::from_secs(3600));
        assert!(config.parallelism >= 1);
        assert!(config.tracing_enabled);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = RuntimeConfig::default()
            .with_max_supersteps(5)
            .with_parallelism(0)
            .with_checkpoint_interval(1);
        assert_eq!(config.max_supersteps, 5);
        assert_eq!(config.parallelism, 1);
        assert_eq!(config.checkpoint_interval, 1);
    }
}
