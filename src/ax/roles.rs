//! Accessibility role names the recorder treats specially.
//!
//! Most roles only matter through configuration (search-path criteria, the
//! skip list, the text-role map). The few below carry built-in meaning:
//! the default text roles, and the table role that enables incremental
//! row-offset collection.

use std::collections::BTreeMap;

use super::Attribute;

pub const AX_TABLE: &str = "AXTable";
pub const AX_STATIC_TEXT: &str = "AXStaticText";
pub const AX_TEXT_AREA: &str = "AXTextArea";

/// Role of the root-level container whose rows are emitted incrementally.
///
/// Only a depth-0 node with exactly this role is eligible for row-offset
/// collection.
pub const ROOT_TABLE_ROLE: &str = AX_TABLE;

/// Roles read as text when a configuration doesn't say otherwise.
pub const DEFAULT_TEXT_ROLES: &[&str] = &[AX_TEXT_AREA, AX_STATIC_TEXT];

/// Default role → attribute map: every [`DEFAULT_TEXT_ROLES`] entry reads
/// its value.
///
/// # Examples
///
/// ```
/// use transcript_recorder::ax::Attribute;
/// use transcript_recorder::ax::roles::default_text_element_roles;
///
/// let roles = default_text_element_roles();
/// assert_eq!(roles.get("AXStaticText"), Some(&Attribute::Value));
/// assert_eq!(roles.get("AXButton"), None);
/// ```
pub fn default_text_element_roles() -> BTreeMap<String, Attribute> {
    DEFAULT_TEXT_ROLES
        .iter()
        .map(|role| (role.to_string(), Attribute::Value))
        .collect()
}

/// Check whether a role is the incremental root table role.
///
/// Matching is exact and case-sensitive, like every role comparison.
pub fn is_root_table_role(role: &str) -> bool {
    role == ROOT_TABLE_ROLE
}
