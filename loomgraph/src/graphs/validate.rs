//! Structural validation performed at `compile()` time.
//!
//! A missing entry point, an edge naming an unregistered vertex, or two
//! vertices sharing one id are compile-time errors rather than a panic at
//! the first superstep. Cycles and unreachable vertices are not errors —
//! a loop back to an earlier vertex is normal Pregel usage — so they are
//! reported as `tracing::warn!` diagnostics instead.

use std::collections::{HashMap, HashSet};

use miette::Diagnostic;
use thiserror::Error;

use crate::types::VertexId;

#[derive(Debug, Error, Diagnostic)]
pub enum GraphBuildError {
    #[error("no entry vertex was set; call `.entry(..)` before `.compile()`")]
    #[diagnostic(code(loomgraph::graph::no_entry_point))]
    NoEntryPoint,

    #[error("edge from '{from}' names unregistered vertex '{to}'")]
    #[diagnostic(code(loomgraph::graph::unknown_vertex))]
    UnknownVertex { from: VertexId, to: VertexId },

    #[error("entry vertex '{0}' is not a registered vertex")]
    #[diagnostic(code(loomgraph::graph::unknown_entry))]
    UnknownEntryVertex(VertexId),

    #[error("vertex '{0}' was registered more than once")]
    #[diagnostic(code(loomgraph::graph::duplicate_vertex))]
    DuplicateVertex(VertexId),
}

/// Checks edge endpoints and the entry point, then warns (never errors)
/// about cycles and vertices unreachable from the entry point.
///
/// Conditional-edge targets are data-dependent and excluded from the cycle
/// and reachability sweep: only the unconditional adjacency map is walked.
pub(super) fn validate(
    vertex_ids: &[VertexId],
    duplicates: &[VertexId],
    edges: &HashMap<VertexId, Vec<VertexId>>,
    entry: Option<&VertexId>,
) -> Result<(), GraphBuildError> {
    if let Some(dup) = duplicates.first() {
        return Err(GraphBuildError::DuplicateVertex(dup.clone()));
    }

    let known: HashSet<&VertexId> = vertex_ids.iter().collect();

    let entry = entry.ok_or(GraphBuildError::NoEntryPoint)?;
    if !known.contains(entry) {
        return Err(GraphBuildError::UnknownEntryVertex(entry.clone()));
    }

    for (from, targets) in edges {
        for to in targets {
            if !to.is_end() && !known.contains(to) {
                return Err(GraphBuildError::UnknownVertex {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
    }

    warn_on_cycles(vertex_ids, edges);
    warn_on_unreachable(vertex_ids, edges, entry);

    Ok(())
}

fn warn_on_cycles(vertex_ids: &[VertexId], edges: &HashMap<VertexId, Vec<VertexId>>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    let mut marks: HashMap<&VertexId, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a VertexId,
        edges: &'a HashMap<VertexId, Vec<VertexId>>,
        marks: &mut HashMap<&'a VertexId, Mark>,
        stack: &mut Vec<&'a VertexId>,
    ) {
        match marks.get(node) {
            Some(Mark::Done) => return,
            Some(Mark::Visiting) => {
                let cycle_start = stack.iter().position(|n| *n == node).unwrap_or(0);
                let cycle: Vec<&str> = stack[cycle_start..].iter().map(|n| n.as_str()).collect();
                tracing::warn!(cycle = ?cycle, "graph contains a cycle reachable through unconditional edges");
                return;
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        stack.push(node);
        if let Some(targets) = edges.get(node) {
            for target in targets {
                if !target.is_end() {
                    visit(target, edges, marks, stack);
                }
            }
        }
        stack.pop();
        marks.insert(node, Mark::Done);
    }

    let mut stack = Vec::new();
    for id in vertex_ids {
        if !marks.contains_key(id) {
            visit(id, edges, &mut marks, &mut stack);
        }
    }
}

fn warn_on_unreachable(
    vertex_ids: &[VertexId],
    edges: &HashMap<VertexId, Vec<VertexId>>,
    entry: &VertexId,
) {
    let mut reachable: HashSet<&VertexId> = HashSet::new();
    let mut queue = vec![entry];
    reachable.insert(entry);
    while let Some(node) = queue.pop() {
        if let Some(targets) = edges.get(node) {
            for target in targets {
                if !target.is_end() && reachable.insert(target) {
                    queue.push(target);
                }
            }
        }
    }

    for id in vertex_ids {
        if !reachable.contains(id) {
            tracing::warn!(vertex = %id, "vertex is unreachable from the entry point via unconditional edges");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entry_point_is_an_error() {
        let err = validate(&[VertexId::new("a")], &[], &HashMap::new(), None);
        assert!(matches!(err, Err(GraphBuildError::NoEntryPoint)));
    }

    #[test]
    fn edge_to_unregistered_vertex_is_an_error() {
        let mut edges = HashMap::new();
        edges.insert(VertexId::new("a"), vec![VertexId::new("ghost")]);
        let err = validate(
            &[VertexId::new("a")],
            &[],
            &edges,
            Some(&VertexId::new("a")),
        );
        assert!(matches!(err, Err(GraphBuildError::UnknownVertex { .. })));
    }

    #[test]
    fn edge_to_end_sentinel_is_allowed() {
        let mut edges = HashMap::new();
        edges.insert(VertexId::new("a"), vec![VertexId::end()]);
        let result = validate(
            &[VertexId::new("a")],
            &[],
            &edges,
            Some(&VertexId::new("a")),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn duplicate_vertex_is_an_error() {
        let err = validate(
            &[VertexId::new("a"), VertexId::new("a")],
            &[VertexId::new("a")],
            &HashMap::new(),
            Some(&VertexId::new("a")),
        );
        assert!(matches!(err, Err(GraphBuildError::DuplicateVertex(_))));
    }
}
