//! Read-only view of a host accessibility tree.
//!
//! The recorder never talks to a platform accessibility API directly. Every
//! node it sees is an [`AxNode`]: an opaque, externally owned handle that can
//! only read a small vocabulary of attributes and list its children. Hosts
//! ([`AxHost`]) hand out the root node of an application process and report
//! whether the accessibility permission has been granted.
//!
//! Two hosts ship with the crate:
//!
//! - [`memory::MemoryHost`]: an in-memory tree, used by tests and by the CLI to
//!   replay a JSON tree dump offline.
//! - `platform::macos::MacAxHost`: the native AXUIElement adapter (macOS only).
//!
//! # Attribute reads
//!
//! [`AxNode::attribute`] returns `None` for any kind of unavailability: the
//! attribute is missing, the element went away between two calls, or the
//! process exited mid-read. Implementations log such failures at `debug` at
//! most and never panic, so a single stale node can't abort a traversal.

pub mod memory;
pub mod roles;

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Scalar accessibility attributes the recorder knows how to read.
///
/// Configuration files may spell an attribute in its canonical form
/// (`value`), its AX form (`AXValue`) or as the ApplicationServices constant
/// name (`kAXValueAttribute`). See [`Attribute::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Role,
    Subrole,
    Title,
    Value,
    Description,
}

impl Attribute {
    /// All scalar attributes, in the order they are serialized.
    pub const ALL: [Attribute; 5] = [
        Attribute::Role,
        Attribute::Subrole,
        Attribute::Title,
        Attribute::Value,
        Attribute::Description,
    ];

    /// Canonical lowercase name (`"role"`, `"value"`, ...).
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Attribute::Role => "role",
            Attribute::Subrole => "subrole",
            Attribute::Title => "title",
            Attribute::Value => "value",
            Attribute::Description => "description",
        }
    }

    /// Name of the attribute in the macOS accessibility API (`"AXRole"`, ...).
    pub fn ax_name(&self) -> &'static str {
        match self {
            Attribute::Role => "AXRole",
            Attribute::Subrole => "AXSubrole",
            Attribute::Title => "AXTitle",
            Attribute::Value => "AXValue",
            Attribute::Description => "AXDescription",
        }
    }

    /// Parse any accepted spelling of an attribute name.
    ///
    /// # Examples
    ///
    /// ```
    /// use transcript_recorder::ax::Attribute;
    ///
    /// assert_eq!(Attribute::parse("value"), Some(Attribute::Value));
    /// assert_eq!(Attribute::parse("AXValue"), Some(Attribute::Value));
    /// assert_eq!(Attribute::parse("kAXValueAttribute"), Some(Attribute::Value));
    /// assert_eq!(Attribute::parse("AXFrame"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Attribute> {
        let bare = name
            .strip_prefix("kAX")
            .and_then(|n| n.strip_suffix("Attribute"))
            .or_else(|| name.strip_prefix("AX"))
            .unwrap_or(name);

        Attribute::ALL
            .into_iter()
            .find(|attr| attr.canonical_name().eq_ignore_ascii_case(bare))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ax_name())
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.ax_name())
    }
}

impl<'de> Deserialize<'de> for Attribute {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Attribute::parse(&name).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown accessibility attribute '{}'", name))
        })
    }
}

/// Value read from a scalar attribute.
///
/// Hosts report strings, numbers and booleans; anything else (points, ranges,
/// element references) is treated as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    Number(f64),
}

impl AttrValue {
    /// The string payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

/// An opaque handle into a host accessibility tree.
///
/// Handles are compared by identity and used as keys in visited sets for the
/// duration of one traversal. They are never mutated by this crate.
pub trait AxNode: Clone + Eq + Hash {
    /// Read a scalar attribute. `None` means unavailable for any reason.
    fn attribute(&self, attribute: Attribute) -> Option<AttrValue>;

    /// Ordered children. Unavailable children read as an empty list.
    fn children(&self) -> Vec<Self>;

    /// Read an attribute and keep it only if it is a string.
    fn string_attribute(&self, attribute: Attribute) -> Option<String> {
        match self.attribute(attribute) {
            Some(AttrValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn role(&self) -> Option<String> {
        self.string_attribute(Attribute::Role)
    }
}

/// Entry point into a platform accessibility API.
pub trait AxHost {
    type Node: AxNode;

    /// Whether this process holds the accessibility permission.
    fn is_trusted(&self) -> bool;

    /// Root node of the application running as `pid`, if one can be created.
    fn application(&self, pid: u32) -> Option<Self::Node>;
}

/// Short human-readable descriptor of a node for log lines.
///
/// Produces `AXWindow "Team Meeting"` when the node has a non-empty title or
/// description, or just the role otherwise.
pub fn describe<N: AxNode>(node: &N) -> String {
    let role = node.role().unwrap_or_else(|| "UnknownRole".to_string());

    let label = [Attribute::Title, Attribute::Description]
        .into_iter()
        .filter_map(|attr| node.string_attribute(attr))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty());

    match label {
        Some(label) => format!("{} \"{}\"", role, label),
        None => role,
    }
}
