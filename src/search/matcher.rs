//! Criteria evaluation against a single node.

use crate::ax::{Attribute, AxNode};
use crate::config::Criteria;

/// Check whether `node` satisfies every key present in `criteria`.
///
/// - `role`, `subrole`, `title`, `description`: exact, case-sensitive equality
/// - `title_contains`, `description_contains`: case-insensitive substring
/// - `title_matches_one_of`: case-insensitive substring of any candidate
///
/// A missing attribute fails any key that reads it. Empty criteria match
/// every node.
///
/// # Examples
///
/// ```
/// use transcript_recorder::ax::memory::MemoryNode;
/// use transcript_recorder::config::Criteria;
/// use transcript_recorder::search::matches;
///
/// let window = MemoryNode::new("AXWindow").with_title("My TEAM Meeting");
/// let criteria = Criteria {
///     role: Some("AXWindow".into()),
///     title_contains: Some("team".into()),
///     ..Criteria::default()
/// };
/// assert!(matches(&window, &criteria));
/// ```
pub fn matches<N: AxNode>(node: &N, criteria: &Criteria) -> bool {
    let exact = [
        (Attribute::Role, &criteria.role),
        (Attribute::Subrole, &criteria.subrole),
        (Attribute::Title, &criteria.title),
        (Attribute::Description, &criteria.description),
    ];
    for (attribute, expected) in exact {
        if let Some(expected) = expected {
            if node.string_attribute(attribute).as_deref() != Some(expected.as_str()) {
                return false;
            }
        }
    }

    let contains = [
        (Attribute::Title, &criteria.title_contains),
        (Attribute::Description, &criteria.description_contains),
    ];
    for (attribute, needle) in contains {
        if let Some(needle) = needle {
            if !folded_contains(node.string_attribute(attribute), std::slice::from_ref(needle)) {
                return false;
            }
        }
    }

    if let Some(candidates) = &criteria.title_matches_one_of {
        if !folded_contains(node.string_attribute(Attribute::Title), candidates) {
            return false;
        }
    }

    true
}

fn folded_contains(actual: Option<String>, needles: &[String]) -> bool {
    let Some(actual) = actual.filter(|a| !a.is_empty()) else {
        return false;
    };
    let actual = actual.to_lowercase();
    needles
        .iter()
        .any(|needle| actual.contains(&needle.to_lowercase()))
}
