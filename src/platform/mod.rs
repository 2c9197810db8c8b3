//! Native accessibility hosts.
//!
//! Only macOS has a native host. On other platforms the recorder still
//! works over any [`AxHost`](crate::ax::AxHost), such as the in-memory host
//! used for replaying tree dumps.

#[cfg(target_os = "macos")]
pub mod macos;
