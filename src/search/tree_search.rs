//! Bounded breadth-first search.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::ax::AxNode;
use crate::config::Criteria;

use super::matcher::matches;

/// Find every node under `start` (inclusive) that satisfies `criteria`.
///
/// The walk is level order. Nodes deeper than `max_depth` are never visited,
/// and a node whose role is in `roles_to_skip` is still matched but its
/// children are not enqueued, except for `start` itself. Each node is visited
/// at most once per call.
///
/// `max_depth` must already be normalized (see
/// [`effective_depth`](crate::config::effective_depth)).
pub fn search<N: AxNode>(
    start: &N,
    criteria: &Criteria,
    max_depth: usize,
    roles_to_skip: &BTreeSet<String>,
) -> Vec<N> {
    let mut results = Vec::new();
    let mut visited: HashSet<N> = HashSet::new();
    let mut queue: VecDeque<(N, usize)> = VecDeque::new();

    visited.insert(start.clone());
    queue.push_back((start.clone(), 0));

    while let Some((node, depth)) = queue.pop_front() {
        if matches(&node, criteria) {
            results.push(node.clone());
        }

        if depth >= max_depth {
            continue;
        }
        if depth > 0 {
            if let Some(role) = node.role() {
                if roles_to_skip.contains(&role) {
                    continue;
                }
            }
        }

        for child in node.children() {
            if visited.insert(child.clone()) {
                queue.push_back((child, depth + 1));
            }
        }
    }

    results
}
