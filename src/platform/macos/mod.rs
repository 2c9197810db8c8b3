//! Native accessibility host for macOS.
//!
//! [`MacAxNode`] wraps an `AXUIElement` and exposes it through the read-only
//! [`AxNode`] contract. Every attribute read is one `AXUIElementCopyAttributeValue`
//! IPC round-trip into the target application; failures (missing attribute,
//! element destroyed, application gone) come back as `None`.
//!
//! The wrapper never releases the element beyond the reference counting the
//! `accessibility` crate already does on clone and drop.

pub mod permissions;

pub use permissions::{
    get_permission_instructions, is_trusted, is_trusted_with_prompt, open_accessibility_preferences,
};

use std::hash::{Hash, Hasher};

use accessibility::{AXUIElement, AXUIElementAttributes};
use accessibility_sys::{
    kAXErrorAttributeUnsupported, kAXErrorNoValue, kAXErrorSuccess, AXUIElementCopyAttributeValue,
};
use core_foundation::base::{CFHash, CFType, CFTypeRef, TCFType};
use core_foundation::boolean::{CFBoolean, CFBooleanRef};
use core_foundation::number::{CFNumber, CFNumberRef};
use core_foundation::string::{CFString, CFStringRef};

use crate::ax::{AttrValue, Attribute, AxHost, AxNode};

/// Handle to a live element in another process's accessibility tree.
#[derive(Clone)]
pub struct MacAxNode(AXUIElement);

impl MacAxNode {
    pub fn new(element: AXUIElement) -> Self {
        Self(element)
    }

    pub fn element(&self) -> &AXUIElement {
        &self.0
    }

    fn copy_attribute(&self, name: &str) -> Option<CFType> {
        let attribute = CFString::new(name);
        let mut value: CFTypeRef = std::ptr::null();
        let result = unsafe {
            AXUIElementCopyAttributeValue(
                self.0.as_concrete_TypeRef(),
                attribute.as_concrete_TypeRef(),
                &mut value as *mut _ as *mut _,
            )
        };

        if result == kAXErrorSuccess && !value.is_null() {
            // Copy rule: we own the returned reference
            return Some(unsafe { CFType::wrap_under_create_rule(value) });
        }
        if result != kAXErrorNoValue && result != kAXErrorAttributeUnsupported {
            log::debug!("[AX-MACOS] Reading {} failed with AXError {}", name, result);
        }
        None
    }
}

/// Convert a CF scalar into an attribute value. Other CF types read as unavailable.
fn to_attr_value(value: &CFType) -> Option<AttrValue> {
    let type_id = value.type_of();
    let ptr = value.as_CFTypeRef();

    if type_id == CFString::type_id() {
        let s = unsafe { CFString::wrap_under_get_rule(ptr as CFStringRef) };
        Some(AttrValue::Text(s.to_string()))
    } else if type_id == CFBoolean::type_id() {
        let b = unsafe { CFBoolean::wrap_under_get_rule(ptr as CFBooleanRef) };
        Some(AttrValue::Bool(b.into()))
    } else if type_id == CFNumber::type_id() {
        let n = unsafe { CFNumber::wrap_under_get_rule(ptr as CFNumberRef) };
        n.to_f64().map(AttrValue::Number)
    } else {
        None
    }
}

impl AxNode for MacAxNode {
    fn attribute(&self, attribute: Attribute) -> Option<AttrValue> {
        self.copy_attribute(attribute.ax_name())
            .as_ref()
            .and_then(to_attr_value)
    }

    fn children(&self) -> Vec<Self> {
        match self.0.children() {
            Ok(children) => children.iter().map(|child| MacAxNode((*child).clone())).collect(),
            Err(e) => {
                log::debug!("[AX-MACOS] Reading AXChildren failed: {:?}", e);
                Vec::new()
            }
        }
    }
}

impl PartialEq for MacAxNode {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MacAxNode {}

impl Hash for MacAxNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Consistent with CFEqual, which backs PartialEq
        let hash = unsafe { CFHash(self.0.as_CFTypeRef()) };
        hash.hash(state);
    }
}

impl std::fmt::Debug for MacAxNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MacAxNode")
            .field(&crate::ax::describe(self))
            .finish()
    }
}

/// The running system's accessibility API.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacAxHost;

impl MacAxHost {
    pub fn new() -> Self {
        Self
    }
}

impl AxHost for MacAxHost {
    type Node = MacAxNode;

    fn is_trusted(&self) -> bool {
        permissions::is_trusted()
    }

    fn application(&self, pid: u32) -> Option<MacAxNode> {
        let pid = i32::try_from(pid).ok()?;
        Some(MacAxNode(AXUIElement::application(pid)))
    }
}
