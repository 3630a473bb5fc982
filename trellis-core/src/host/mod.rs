//! Host Adapter
//!
//! The engine never touches a platform tree directly. Everything it needs is
//! the handful of primitives on [`Host`]: create element and text handles,
//! set or remove a prop, attach, move and detach handles, and replace text.
//!
//! [`MemoryHost`] is an in-memory document implementing the trait. It is the
//! reference adapter for embedders and what the test suite renders into.

mod memory;

pub use memory::{HostNodeSnapshot, HostOp, MemoryHost};

use serde::{Deserialize, Serialize};

use crate::element::{PropValue, Props};
use crate::error::HostError;

/// Opaque reference to a node owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostHandle(u64);

impl HostHandle {
    /// Wrap a host-assigned id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The host-assigned id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Mutation primitives of the target platform.
pub trait Host: Send {
    fn create_element(&mut self, tag: &str) -> Result<HostHandle, HostError>;

    fn create_text(&mut self, text: &str) -> Result<HostHandle, HostError>;

    /// Set an attribute or listener, or remove it when `value` is `None`.
    fn set_property(
        &mut self,
        handle: HostHandle,
        name: &str,
        value: Option<&PropValue>,
    ) -> Result<(), HostError>;

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    fn append_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError>;

    /// Insert `child` immediately before `reference`, detaching it from any
    /// previous position first.
    fn insert_before(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
        reference: HostHandle,
    ) -> Result<(), HostError>;

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError>;

    /// Replace the text of a text handle, or replace all children of an
    /// element with the given text.
    fn set_text_content(&mut self, handle: HostHandle, text: &str) -> Result<(), HostError>;
}

/// Bring a handle's attributes, listeners and text from `prev` to `next`.
///
/// Only values that differ are written. Listeners that changed identity are
/// removed before the replacement is set.
pub(crate) fn apply_props(
    host: &mut dyn Host,
    handle: HostHandle,
    prev: Option<&Props>,
    next: &Props,
) -> Result<usize, HostError> {
    let mut writes = 0;

    if let Some(prev) = prev {
        for (name, old) in prev.attrs() {
            match next.get(name) {
                None => {
                    host.set_property(handle, name, None)?;
                    writes += 1;
                }
                Some(new) if old.as_listener().is_some() && new != old => {
                    host.set_property(handle, name, None)?;
                    writes += 1;
                }
                Some(_) => {}
            }
        }

        // stale text is about to be replaced by non-text children
        if prev.children().as_text().is_some() && next.children().as_text().is_none() {
            host.set_text_content(handle, "")?;
            writes += 1;
        }
    }

    for (name, value) in next.attrs() {
        if prev.and_then(|p| p.get(name)) != Some(value) {
            host.set_property(handle, name, Some(value))?;
            writes += 1;
        }
    }

    if let Some(text) = next.children().as_text() {
        if prev.and_then(|p| p.children().as_text()) != Some(text) {
            host.set_text_content(handle, text)?;
            writes += 1;
        }
    }

    Ok(writes)
}
