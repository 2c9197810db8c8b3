//! Text collection from the transcript element's subtree.
//!
//! The collector walks the subtree under a start node, bounded by depth and
//! pruned by the skip list the same way [`search`](crate::search::search)
//! is, and turns every node whose role is in the text-role map into one
//! output line.
//!
//! The traversal strategy is chosen once per call:
//!
//! - [`Traversal::Bfs`]: level order
//! - [`Traversal::Dfs`]: pre-order, depth first
//! - [`Traversal::IncrementalBfs`]: level order, but a depth-0 `AXTable` only
//!   has its rows from `previous_rows - INCREMENTAL_OVERLAP_ROWS` onward
//!   visited. The overlap keeps enough already-exported rows in every
//!   snapshot for [`merge_lines`](crate::merge::merge_lines) to find a real
//!   overlap.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use regex_lite::Regex;

use crate::ax::memory::NodeDump;
use crate::ax::roles::is_root_table_role;
use crate::ax::{AttrValue, Attribute, AxNode};
use crate::config::{AppConfig, TraversalMode};
use crate::merge::DEFAULT_MIN_MATCH_LENGTH;

/// Rows re-read from a growing root table on each incremental pass.
pub const INCREMENTAL_OVERLAP_ROWS: usize = 2 * DEFAULT_MIN_MATCH_LENGTH;

const _: () = assert!(INCREMENTAL_OVERLAP_ROWS > DEFAULT_MIN_MATCH_LENGTH);

/// Traversal strategy for one collection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Bfs,
    Dfs,
    /// Level order resuming a depth-0 root table after `previous_rows`
    IncrementalBfs { previous_rows: usize },
}

impl Traversal {
    /// Pick the strategy for a configured mode.
    ///
    /// Incremental collection only exists for level order; a depth-first
    /// configuration always re-walks everything.
    pub fn select(mode: TraversalMode, incremental: bool, previous_rows: usize) -> Self {
        match (mode, incremental) {
            (TraversalMode::Bfs, true) => Traversal::IncrementalBfs { previous_rows },
            (TraversalMode::Bfs, false) => Traversal::Bfs,
            (TraversalMode::Dfs, incremental) => {
                if incremental {
                    log::debug!("[AX-COLLECT] incremental_export ignored in dfs mode");
                }
                Traversal::Dfs
            }
        }
    }
}

/// Output of one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    /// One entry per extracted text value, in traversal order
    pub lines: Vec<String>,

    /// Child count of the depth-0 root table, when incremental collection
    /// applied and the table had rows
    pub table_rows: Option<usize>,
}

/// Collection parameters shared by every pass of a recorder.
#[derive(Debug, Clone, Copy)]
pub struct Collector<'a> {
    pub max_depth: usize,
    pub text_roles: &'a BTreeMap<String, Attribute>,
    pub roles_to_skip: &'a BTreeSet<String>,
    pub exclude: Option<&'a Regex>,
}

impl<'a> Collector<'a> {
    pub fn from_config(config: &'a AppConfig, exclude: Option<&'a Regex>) -> Self {
        Collector {
            max_depth: config.export_depth(),
            text_roles: &config.serialization_text_element_roles,
            roles_to_skip: &config.traversal_roles_to_skip,
            exclude,
        }
    }

    /// Collect text lines under `start` (inclusive).
    pub fn collect<N: AxNode>(&self, start: &N, traversal: Traversal) -> Collected {
        let collected = match traversal {
            Traversal::Bfs => self.collect_bfs(start, None),
            Traversal::IncrementalBfs { previous_rows } => self.collect_bfs(start, Some(previous_rows)),
            Traversal::Dfs => Collected {
                lines: self.collect_dfs(start),
                table_rows: None,
            },
        };
        log::debug!(
            "[AX-COLLECT] {} line(s) collected ({:?})",
            collected.lines.len(),
            traversal
        );
        collected
    }

    fn collect_bfs<N: AxNode>(&self, start: &N, previous_rows: Option<usize>) -> Collected {
        let mut lines = Vec::new();
        let mut table_rows = None;
        let mut visited: HashSet<N> = HashSet::new();
        let mut queue: VecDeque<(N, usize)> = VecDeque::new();

        visited.insert(start.clone());
        queue.push_back((start.clone(), 0));

        while let Some((node, depth)) = queue.pop_front() {
            let role = node.role();
            if let Some(line) = self.extract(&node, role.as_deref()) {
                lines.push(line);
            }
            if !self.descends(depth, role.as_deref()) {
                continue;
            }

            let mut children = node.children();
            if depth == 0 {
                if let (Some(previous), Some(true)) =
                    (previous_rows, role.as_deref().map(is_root_table_role))
                {
                    let count = children.len();
                    let first_new = previous.saturating_sub(INCREMENTAL_OVERLAP_ROWS);
                    log::debug!(
                        "[AX-COLLECT] incremental table: {} row(s), resuming at {}",
                        count,
                        first_new
                    );
                    children = children.into_iter().skip(first_new).collect();
                    if count > 0 {
                        table_rows = Some(count);
                    }
                }
            }

            for child in children {
                if visited.insert(child.clone()) {
                    queue.push_back((child, depth + 1));
                }
            }
        }

        Collected { lines, table_rows }
    }

    fn collect_dfs<N: AxNode>(&self, start: &N) -> Vec<String> {
        let mut lines = Vec::new();
        let mut visited: HashSet<N> = HashSet::new();
        let mut stack: Vec<(N, usize)> = vec![(start.clone(), 0)];

        while let Some((node, depth)) = stack.pop() {
            if !visited.insert(node.clone()) {
                continue;
            }
            let role = node.role();
            if let Some(line) = self.extract(&node, role.as_deref()) {
                lines.push(line);
            }
            if !self.descends(depth, role.as_deref()) {
                continue;
            }
            for child in node.children().into_iter().rev() {
                if !visited.contains(&child) {
                    stack.push((child, depth + 1));
                }
            }
        }

        lines
    }

    fn descends(&self, depth: usize, role: Option<&str>) -> bool {
        if depth >= self.max_depth {
            return false;
        }
        !(depth > 0 && role.is_some_and(|r| self.roles_to_skip.contains(r)))
    }

    fn extract<N: AxNode>(&self, node: &N, role: Option<&str>) -> Option<String> {
        let attribute = self.text_roles.get(role?)?;
        let raw = match node.attribute(*attribute)? {
            AttrValue::Text(s) => s,
            _ => return None,
        };
        clean_line(&raw, self.exclude)
    }
}

/// Trim a raw value and strip `exclude` matches; `None` if nothing is left.
///
/// ```
/// use regex_lite::Regex;
/// use transcript_recorder::collect::clean_line;
///
/// let redact = Regex::new(r"\[REDACTED\]").unwrap();
/// assert_eq!(clean_line(" Hello [REDACTED] world ", Some(&redact)).as_deref(), Some("Hello  world"));
/// assert_eq!(clean_line("[REDACTED]", Some(&redact)), None);
/// ```
pub fn clean_line(raw: &str, exclude: Option<&Regex>) -> Option<String> {
    let mut text = raw.trim().to_string();
    if text.is_empty() {
        return None;
    }
    if let Some(pattern) = exclude {
        text = pattern.replace_all(&text, "").trim().to_string();
    }
    (!text.is_empty()).then_some(text)
}

/// Dump a subtree's scalar attributes as a [`NodeDump`].
///
/// Uses the same depth bound and skip semantics as collection: skipped-role
/// nodes below the root appear without their children. Nodes reached twice
/// are dumped once.
pub fn serialize_tree<N: AxNode>(
    node: &N,
    max_depth: usize,
    roles_to_skip: &BTreeSet<String>,
) -> NodeDump {
    let mut visited = HashSet::new();
    visited.insert(node.clone());
    dump_node(node, 0, max_depth, roles_to_skip, &mut visited)
}

fn dump_node<N: AxNode>(
    node: &N,
    depth: usize,
    max_depth: usize,
    roles_to_skip: &BTreeSet<String>,
    visited: &mut HashSet<N>,
) -> NodeDump {
    let role = node.role();
    let skipped = depth > 0 && role.as_ref().is_some_and(|r| roles_to_skip.contains(r));

    let mut children = Vec::new();
    if depth < max_depth && !skipped {
        for child in node.children() {
            if visited.insert(child.clone()) {
                children.push(dump_node(&child, depth + 1, max_depth, roles_to_skip, visited));
            }
        }
    }

    NodeDump {
        role,
        subrole: node.string_attribute(Attribute::Subrole),
        title: node.string_attribute(Attribute::Title),
        value: node.attribute(Attribute::Value),
        description: node.string_attribute(Attribute::Description),
        children,
    }
}
