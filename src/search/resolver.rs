//! Search-path evaluation across candidate process roots.

use std::collections::BTreeSet;

use crate::ax::{describe, AxNode};
use crate::config::{effective_depth, SearchPath, Step};

use super::tree_search::search;

/// Why a single path failed for one process root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFailure {
    /// Step `step` matched nothing
    NoMatches { step: usize },
    /// Step `step` matched `found` nodes but asked for `index`
    IndexOutOfRange { step: usize, index: usize, found: usize },
}

/// Resolve the transcript element.
///
/// Process roots are tried in order; for each root the paths are tried in
/// order, and the first path whose every step succeeds wins. Returns `None`
/// when no (root, path) combination resolves.
pub fn resolve<N: AxNode>(
    roots: &[N],
    paths: &[SearchPath],
    roles_to_skip: &BTreeSet<String>,
) -> Option<N> {
    for (root_idx, root) in roots.iter().enumerate() {
        for (path_idx, path) in paths.iter().enumerate() {
            let name = path.display_name(path_idx);
            match evaluate_path(root, path, roles_to_skip) {
                Ok(target) => {
                    log::info!(
                        "[AX-SEARCH] Path '{}' resolved {} (process root {})",
                        name,
                        describe(&target),
                        root_idx
                    );
                    return Some(target);
                }
                Err(StepFailure::NoMatches { step }) => {
                    log::debug!(
                        "[AX-SEARCH] Path '{}' failed at step {}: no matches (process root {})",
                        name,
                        step + 1,
                        root_idx
                    );
                }
                Err(StepFailure::IndexOutOfRange { step, index, found }) => {
                    log::warn!(
                        "[AX-SEARCH] Path '{}' failed at step {}: index {} out of range ({} found)",
                        name,
                        step + 1,
                        index,
                        found
                    );
                }
            }
        }
    }
    None
}

/// Evaluate one path from one root.
///
/// A path with no steps resolves to the root itself.
pub fn evaluate_path<N: AxNode>(
    root: &N,
    path: &SearchPath,
    roles_to_skip: &BTreeSet<String>,
) -> Result<N, StepFailure> {
    let mut current = vec![root.clone()];

    for (step_idx, step) in path.steps.iter().enumerate() {
        let combined = run_step(&current, step, roles_to_skip);
        if combined.is_empty() {
            return Err(StepFailure::NoMatches { step: step_idx });
        }

        current = match step.index {
            Some(index) => match combined.get(index) {
                Some(node) => vec![node.clone()],
                None => {
                    return Err(StepFailure::IndexOutOfRange {
                        step: step_idx,
                        index,
                        found: combined.len(),
                    })
                }
            },
            None => combined,
        };
    }

    // `current` is never empty here
    current
        .into_iter()
        .next()
        .ok_or(StepFailure::NoMatches { step: 0 })
}

fn run_step<N: AxNode>(current: &[N], step: &Step, roles_to_skip: &BTreeSet<String>) -> Vec<N> {
    let depth = effective_depth(step.search_scope.levels_deep);
    current
        .iter()
        .flat_map(|node| search(node, &step.criteria, depth, roles_to_skip))
        .collect()
}
