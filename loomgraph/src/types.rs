//! Core identity types for the Pregel workflow graph.
//!
//! This module defines the fundamental types used to address vertices and
//! track their scheduling state across supersteps. These are the core
//! domain concepts that define what a workflow graph *is*, independent of
//! any particular vertex kind or state representation.
//!
//! # Key Types
//!
//! - [`VertexId`]: Opaque, globally-unique identifier for a vertex.
//! - [`VertexState`]: The three-way halt/reactivate lifecycle a vertex moves through.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque string identifier for a vertex, unique within one compiled graph.
///
/// `VertexId` is a thin newtype over `String` rather than an enum closed over
/// `Start`/`End`/`Custom` variants: there is no virtual `Start` node (the
/// builder's designated entry vertex plays that role), but one sentinel is
/// reserved — [`VertexId::end`] — which never names a real vertex and always
/// signals workflow termination when used as a message or edge target.
///
/// # Examples
///
/// ```rust
/// use loomgraph::types::VertexId;
///
/// let planner = VertexId::new("planner");
/// assert_eq!(planner.as_str(), "planner");
/// assert!(!planner.is_end());
/// assert!(VertexId::end().is_end());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(String);

impl VertexId {
    /// The reserved sentinel target that designates workflow termination.
    ///
    /// Messages addressed to `END` are dropped by the runtime rather than
    /// routed to a vertex; edges targeting `END` are the builder's way of
    /// declaring an exit point.
    pub fn end() -> Self {
        Self("END".to_string())
    }

    /// Construct a new vertex identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this identifier is the reserved `END` sentinel.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.0 == "END"
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The three-way lifecycle every vertex moves through across supersteps.
///
/// A `Completed` vertex never returns to `Active` or `Halted`, and a `Halted`
/// vertex reactivates only by receiving a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexState {
    /// Will run next superstep unconditionally.
    Active,
    /// Skipped next superstep unless a message is delivered to it.
    Halted,
    /// Never runs again; messages addressed to it are dropped and logged.
    Completed,
}

impl VertexState {
    /// Returns `true` for [`VertexState::Halted`].
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }

    /// Returns `true` for [`VertexState::Active`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` for [`VertexState::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for VertexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Halted => write!(f, "halted"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_id_end_sentinel_is_reserved() {
        let end = VertexId::end();
        assert!(end.is_end());
        assert_eq!(end.as_str(), "END");
    }

    #[test]
    fn vertex_id_ordering_is_lexicographic() {
        let mut ids = vec![VertexId::new("b"), VertexId::new("a"), VertexId::new("c")];
        ids.sort();
        assert_eq!(
            ids.iter().map(VertexId::as_str).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn vertex_state_transitions_query_correctly() {
        assert!(VertexState::Active.is_active());
        assert!(VertexState::Halted.is_halted());
        assert!(VertexState::Completed.is_completed());
        assert!(!VertexState::Completed.is_active());
    }
}
