//! Locating the transcript element.
//!
//! Three layers, leaf first:
//!
//! - [`matches`]: does one node satisfy a [`Criteria`](crate::config::Criteria)?
//! - [`search`]: bounded breadth-first search collecting every match below a node
//! - [`resolve`]: ordered search-path evaluation across process roots
//!
//! All of them are read-only over the host tree and treat unreadable
//! attributes as absent.

pub mod matcher;
pub mod resolver;
pub mod tree_search;

pub use matcher::matches;
pub use resolver::{evaluate_path, resolve, StepFailure};
pub use tree_search::search;
