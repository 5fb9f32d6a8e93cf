//! Lightweight ID generation for workflow runs and checkpoints.

use uuid::Uuid;

/// Generates process-unique identifiers for workflow runs.
///
/// A thin wrapper over [`Uuid::new_v4`] so callers have one place to swap
/// the scheme (e.g. to a sortable ULID) without touching call sites.
#[derive(Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh run identifier, e.g. `run-3fb621c4...`.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        format!("run-{}", Uuid::new_v4())
    }
}
