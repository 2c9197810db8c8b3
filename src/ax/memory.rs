//! In-memory accessibility tree.
//!
//! [`MemoryNode`] behaves like a live host tree: nodes are compared by
//! identity, children and attributes can be changed while a recorder holds a
//! handle, and a node can be [detached](MemoryNode::detach) to simulate an
//! application tearing down a panel. Trees can be built in code or loaded from
//! the JSON dump format produced by [`serialize_tree`](crate::collect::serialize_tree):
//!
//! ```json
//! {"role": "AXWindow", "title": "Team Meeting", "children": [
//!     {"role": "AXStaticText", "value": "Hello"}
//! ]}
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::{AttrValue, Attribute, AxHost, AxNode};

/// Serializable snapshot of one node and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDump {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subrole: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDump>,
}

#[derive(Debug, Default)]
struct Element {
    attributes: RwLock<BTreeMap<Attribute, AttrValue>>,
    children: RwLock<Vec<MemoryNode>>,
    detached: AtomicBool,
}

/// Identity-compared handle into an in-memory tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryNode(Arc<Element>);

impl MemoryNode {
    /// Create a detached-from-any-parent node with the given role.
    pub fn new(role: &str) -> Self {
        MemoryNode::default().with_attribute(Attribute::Role, role)
    }

    pub fn with_attribute(self, attribute: Attribute, value: impl Into<AttrValue>) -> Self {
        self.set_attribute(attribute, value);
        self
    }

    pub fn with_subrole(self, subrole: &str) -> Self {
        self.with_attribute(Attribute::Subrole, subrole)
    }

    pub fn with_title(self, title: &str) -> Self {
        self.with_attribute(Attribute::Title, title)
    }

    pub fn with_value(self, value: impl Into<AttrValue>) -> Self {
        self.with_attribute(Attribute::Value, value)
    }

    pub fn with_description(self, description: &str) -> Self {
        self.with_attribute(Attribute::Description, description)
    }

    pub fn with_child(self, child: MemoryNode) -> Self {
        self.push_child(child);
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = MemoryNode>) -> Self {
        for child in children {
            self.push_child(child);
        }
        self
    }

    /// Set or replace an attribute on a live node.
    pub fn set_attribute(&self, attribute: Attribute, value: impl Into<AttrValue>) {
        let mut attributes = self.0.attributes.write().unwrap_or_else(|e| e.into_inner());
        attributes.insert(attribute, value.into());
    }

    /// Append a child to a live node.
    pub fn push_child(&self, child: MemoryNode) {
        let mut children = self.0.children.write().unwrap_or_else(|e| e.into_inner());
        children.push(child);
    }

    /// Drop all children of a live node.
    pub fn clear_children(&self) {
        let mut children = self.0.children.write().unwrap_or_else(|e| e.into_inner());
        children.clear();
    }

    /// Make every later read on this node fail, as if the host element was
    /// destroyed. The node keeps its identity.
    pub fn detach(&self) {
        self.0.detached.store(true, Ordering::SeqCst);
    }

    pub fn is_detached(&self) -> bool {
        self.0.detached.load(Ordering::SeqCst)
    }

    /// Build a tree from a dump. Every call creates fresh node identities.
    pub fn from_dump(dump: &NodeDump) -> Self {
        let node = MemoryNode::default();
        let scalars = [
            (Attribute::Role, dump.role.clone().map(AttrValue::Text)),
            (Attribute::Subrole, dump.subrole.clone().map(AttrValue::Text)),
            (Attribute::Title, dump.title.clone().map(AttrValue::Text)),
            (Attribute::Value, dump.value.clone()),
            (Attribute::Description, dump.description.clone().map(AttrValue::Text)),
        ];
        for (attribute, value) in scalars {
            if let Some(value) = value {
                node.set_attribute(attribute, value);
            }
        }
        for child in &dump.children {
            node.push_child(MemoryNode::from_dump(child));
        }
        node
    }

    /// Parse a JSON tree dump.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let dump: NodeDump = serde_json::from_str(json)?;
        Ok(MemoryNode::from_dump(&dump))
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryNode {}

impl Hash for MemoryNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl AxNode for MemoryNode {
    fn attribute(&self, attribute: Attribute) -> Option<AttrValue> {
        if self.is_detached() {
            log::debug!("[AX-MEMORY] read of {} on detached node", attribute);
            return None;
        }
        let attributes = self.0.attributes.read().unwrap_or_else(|e| e.into_inner());
        attributes.get(&attribute).cloned()
    }

    fn children(&self) -> Vec<Self> {
        if self.is_detached() {
            return Vec::new();
        }
        let children = self.0.children.read().unwrap_or_else(|e| e.into_inner());
        children.clone()
    }
}

/// Host over in-memory application trees keyed by process id.
///
/// Clones share state, so a test can keep a handle and change the host while
/// a recorder owns another.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    applications: Arc<RwLock<HashMap<u32, MemoryNode>>>,
    trusted: Arc<AtomicBool>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            applications: Arc::new(RwLock::new(HashMap::new())),
            trusted: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application(self, pid: u32, root: MemoryNode) -> Self {
        self.insert_application(pid, root);
        self
    }

    pub fn insert_application(&self, pid: u32, root: MemoryNode) {
        let mut apps = self.applications.write().unwrap_or_else(|e| e.into_inner());
        apps.insert(pid, root);
    }

    pub fn remove_application(&self, pid: u32) -> Option<MemoryNode> {
        let mut apps = self.applications.write().unwrap_or_else(|e| e.into_inner());
        apps.remove(&pid)
    }

    pub fn set_trusted(&self, trusted: bool) {
        self.trusted.store(trusted, Ordering::SeqCst);
    }
}

impl AxHost for MemoryHost {
    type Node = MemoryNode;

    fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::SeqCst)
    }

    fn application(&self, pid: u32) -> Option<MemoryNode> {
        let apps = self.applications.read().unwrap_or_else(|e| e.into_inner());
        apps.get(&pid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_equality() {
        let a = MemoryNode::new("AXStaticText").with_value("same");
        let b = MemoryNode::new("AXStaticText").with_value("same");

        assert_eq!(a, a.clone());
        assert_ne!(a, b);

        let set: HashSet<MemoryNode> = [a.clone(), a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_live_mutation_is_visible_through_clones() {
        let table = MemoryNode::new("AXTable");
        let handle = table.clone();

        handle.push_child(MemoryNode::new("AXRow"));
        handle.push_child(MemoryNode::new("AXRow"));
        assert_eq!(table.children().len(), 2);

        handle.clear_children();
        assert!(table.children().is_empty());
    }

    #[test]
    fn test_detached_node_reads_nothing() {
        let node = MemoryNode::new("AXGroup").with_child(MemoryNode::new("AXStaticText"));
        node.detach();

        assert!(node.is_detached());
        assert_eq!(node.role(), None);
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_from_json_str_builds_tree() {
        let json = r#"{
            "role": "AXWindow",
            "title": "Team Meeting",
            "children": [
                {"role": "AXStaticText", "value": "Hello"},
                {"role": "AXCheckBox", "value": true}
            ]
        }"#;
        let root = MemoryNode::from_json_str(json).unwrap();

        assert_eq!(root.role().as_deref(), Some("AXWindow"));
        assert_eq!(root.string_attribute(Attribute::Title).as_deref(), Some("Team Meeting"));

        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].attribute(Attribute::Value), Some(AttrValue::from("Hello")));
        assert_eq!(children[1].attribute(Attribute::Value), Some(AttrValue::Bool(true)));
        assert_eq!(children[1].attribute(Attribute::Subrole), None);
    }

    #[test]
    fn test_from_json_str_rejects_malformed_input() {
        assert!(MemoryNode::from_json_str("{\"children\": 3}").is_err());
    }

    #[test]
    fn test_host_shares_state_between_clones() {
        let host = MemoryHost::new();
        let handle = host.clone();
        let root = MemoryNode::new("AXApplication");

        handle.insert_application(42, root.clone());
        assert_eq!(host.application(42), Some(root));
        assert_eq!(host.application(7), None);

        handle.set_trusted(false);
        assert!(!host.is_trusted());

        assert!(handle.remove_application(42).is_some());
        assert_eq!(host.application(42), None);
    }
}
