//! The workflow state contract: an immutable base value paired with a
//! commutative `Update` type.
//!
//! State is a cloneable, serializable container mutated only through
//! explicit updates and snapshotted for vertex consumption, expressed as a
//! trait so applications can supply their own state type instead of being
//! locked into one fixed shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

use crate::utils::json_ext::{self, MergeStrategy};

/// The commutative monoid of updates a [`WorkflowState`] merges at each
/// superstep barrier.
///
/// Implementations must satisfy: `Self::merge(&[])` equals [`Self::empty`],
/// and for any permutation of a slice of updates, `Self::merge` produces an
/// equal result. The runtime feeds `merge` updates pre-sorted by `VertexId`
/// so that even an implementation that is not *exactly* commutative in
/// practice still produces reproducible results.
pub trait StateUpdate: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The monoid identity: merging zero updates must yield this value.
    fn empty() -> Self;

    /// Merge a batch of updates produced within one superstep into one.
    fn merge(updates: &[Self]) -> Self;
}

/// The user-defined, cloneable, serializable value that evolves across
/// supersteps.
///
/// `apply_update` is pure: it returns a new state rather than mutating
/// `self`. Updates are merged only after every vertex in a superstep
/// completes, and no vertex observes another's update within the same
/// superstep. `project` exposes a JSON view of the state so generic vertex
/// kinds (router branch matching, tool argument templating, sub-agent
/// output mapping) can read named paths out of an arbitrary application
/// state type without the runtime needing to know its shape.
pub trait WorkflowState: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Update: StateUpdate;

    /// Apply a merged update, returning the next state.
    fn apply_update(&self, update: Self::Update) -> Self;

    /// Whether the workflow should terminate after this state is committed.
    fn is_terminal(&self) -> bool {
        false
    }

    /// A JSON projection of this state, used for path-based reads by
    /// router/tool/sub-agent vertices (`state_field` branches, argument
    /// templates, output maps).
    fn project(&self) -> Value;
}

/// A general-purpose [`WorkflowState`] backed by a single JSON object.
///
/// Most graphs that don't need a bespoke state type can use `JsonState` and
/// its paired [`JsonUpdate`]: updates are shallow/deep JSON merges (via
/// [`json_ext::deep_merge`]) folded in sorted-`VertexId` order, and
/// `is_terminal` follows the convention that a top-level boolean
/// `"__terminal__": true` key ends the workflow. Tool/router/agent vertices
/// read and write through dotted JSON paths (see
/// `utils::json_ext::{get_by_path, set_by_path}`) against this same object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonState(pub Value);

impl JsonState {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl WorkflowState for JsonState {
    type Update = JsonUpdate;

    fn apply_update(&self, update: Self::Update) -> Self {
        let merged = json_ext::deep_merge(&self.0, &update.0, MergeStrategy::DeepMerge)
            .unwrap_or_else(|_| update.0.clone());
        Self(merged)
    }

    fn is_terminal(&self) -> bool {
        self.0
            .get("__terminal__")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn project(&self) -> Value {
        self.0.clone()
    }
}

/// The JSON-object update type paired with [`JsonState`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonUpdate(pub Value);

impl JsonUpdate {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn set(path: &str, value: Value) -> Self {
        let mut obj = Value::Object(Map::new());
        let _ = json_ext::set_by_path(&mut obj, path, value);
        Self(obj)
    }
}

impl StateUpdate for JsonUpdate {
    fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    fn merge(updates: &[Self]) -> Self {
        let mut acc = Value::Object(Map::new());
        for update in updates {
            acc = json_ext::deep_merge(&acc, &update.0, MergeStrategy::DeepMerge)
                .unwrap_or_else(|_| update.0.clone());
        }
        Self(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_merge_yields_identity() {
        let merged = JsonUpdate::merge(&[]);
        assert_eq!(merged, JsonUpdate::empty());
    }

    #[test]
    fn merge_is_order_independent_for_disjoint_keys() {
        let a = JsonUpdate::set("a", json!(1));
        let b = JsonUpdate::set("b", json!(2));
        let forward = JsonUpdate::merge(&[a.clone(), b.clone()]);
        let backward = JsonUpdate::merge(&[b, a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn apply_update_is_pure() {
        let state = JsonState::new(json!({"count": 1}));
        let next = state.apply_update(JsonUpdate::set("count", json!(2)));
        assert_eq!(state.project()["count"], json!(1));
        assert_eq!(next.project()["count"], json!(2));
    }

    #[test]
    fn terminal_flag_convention() {
        let state = JsonState::new(json!({"__terminal__": true}));
        assert!(state.is_terminal());
        assert!(!JsonState::empty().is_terminal());
    }
}
