//! In-memory Document
//!
//! A small document tree with DOM-like mutation semantics: inserting a handle
//! that is already attached moves it, and setting the text of an element
//! replaces its children. Every mutation is appended to an operation log so
//! callers can assert on exactly what a commit did.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

use super::{Host, HostHandle};
use crate::element::{event_name, Event, Listener, PropValue};
use crate::error::HostError;

/// One recorded host mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    CreateElement { handle: HostHandle, tag: String },
    CreateText { handle: HostHandle, text: String },
    SetProperty { handle: HostHandle, name: String, removed: bool },
    AppendChild { parent: HostHandle, child: HostHandle },
    InsertBefore { parent: HostHandle, child: HostHandle, reference: HostHandle },
    RemoveChild { parent: HostHandle, child: HostHandle },
    SetTextContent { handle: HostHandle, text: String },
}

/// Serializable view of a host subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostNodeSnapshot {
    pub handle: HostHandle,
    /// Tag name, or `#text`.
    pub tag: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HostNodeSnapshot>,
}

#[derive(Debug)]
enum NodeKind {
    Element(String),
    Text,
}

#[derive(Debug)]
struct HostNode {
    kind: NodeKind,
    attributes: IndexMap<String, String>,
    listeners: IndexMap<String, Listener>,
    /// Text of a text node, or text content set directly on an element.
    text: String,
    children: Vec<HostHandle>,
    parent: Option<HostHandle>,
}

impl HostNode {
    fn new(kind: NodeKind, text: String) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            listeners: IndexMap::new(),
            text,
            children: Vec::new(),
            parent: None,
        }
    }
}

#[derive(Debug, Default)]
struct Document {
    nodes: HashMap<HostHandle, HostNode>,
    next_handle: u64,
    ops: Vec<HostOp>,
}

impl Document {
    fn insert(&mut self, node: HostNode) -> HostHandle {
        self.next_handle += 1;
        let handle = HostHandle::new(self.next_handle);
        self.nodes.insert(handle, node);
        handle
    }

    fn node(&self, handle: HostHandle) -> Result<&HostNode, HostError> {
        self.nodes.get(&handle).ok_or(HostError::UnknownHandle(handle))
    }

    fn node_mut(&mut self, handle: HostHandle) -> Result<&mut HostNode, HostError> {
        self.nodes.get_mut(&handle).ok_or(HostError::UnknownHandle(handle))
    }

    fn element_mut(&mut self, handle: HostHandle) -> Result<&mut HostNode, HostError> {
        let node = self.node_mut(handle)?;
        match node.kind {
            NodeKind::Element(_) => Ok(node),
            NodeKind::Text => Err(HostError::TextNode(handle)),
        }
    }

    /// Drop `handle` and its whole subtree from the document.
    fn discard(&mut self, handle: HostHandle) {
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
    }

    fn detach(&mut self, child: HostHandle) -> Result<(), HostError> {
        let parent = self.node_mut(child)?.parent.take();
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != child);
        }
        Ok(())
    }

    fn record(&mut self, op: HostOp) {
        tracing::trace!(?op, "host mutation");
        self.ops.push(op);
    }

    fn markup(&self, handle: HostHandle, out: &mut String) -> Result<(), HostError> {
        let node = self.node(handle)?;
        match &node.kind {
            NodeKind::Text => out.push_str(&node.text),
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.attributes {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                out.push_str(&node.text);
                for child in &node.children {
                    self.markup(*child, out)?;
                }
                let _ = write!(out, "</{tag}>");
            }
        }
        Ok(())
    }

    fn snapshot(&self, handle: HostHandle) -> Result<HostNodeSnapshot, HostError> {
        let node = self.node(handle)?;
        let tag = match &node.kind {
            NodeKind::Element(tag) => tag.clone(),
            NodeKind::Text => "#text".to_string(),
        };
        let children = node
            .children
            .iter()
            .map(|child| self.snapshot(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HostNodeSnapshot {
            handle,
            tag,
            attributes: node.attributes.clone(),
            listeners: node.listeners.keys().cloned().collect(),
            text: node.text.clone(),
            children,
        })
    }
}

/// Shared in-memory document. Clones refer to the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    doc: Arc<Mutex<Document>>,
}

impl MemoryHost {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element to mount a root into. Not logged.
    pub fn create_container(&self, tag: &str) -> HostHandle {
        self.doc
            .lock()
            .insert(HostNode::new(NodeKind::Element(tag.to_string()), String::new()))
    }

    /// Markup of the subtree under `handle`.
    pub fn to_markup(&self, handle: HostHandle) -> Result<String, HostError> {
        let mut out = String::new();
        self.doc.lock().markup(handle, &mut out)?;
        Ok(out)
    }

    /// Markup of the children of `handle`, without the handle's own tag.
    pub fn inner_markup(&self, handle: HostHandle) -> Result<String, HostError> {
        let doc = self.doc.lock();
        let node = doc.node(handle)?;
        let mut out = node.text.clone();
        for child in &node.children {
            doc.markup(*child, &mut out)?;
        }
        Ok(out)
    }

    /// Serializable view of the subtree under `handle`.
    pub fn snapshot(&self, handle: HostHandle) -> Result<HostNodeSnapshot, HostError> {
        self.doc.lock().snapshot(handle)
    }

    /// Child handles of `handle`, in order.
    pub fn children(&self, handle: HostHandle) -> Result<Vec<HostHandle>, HostError> {
        Ok(self.doc.lock().node(handle)?.children.clone())
    }

    /// Parent of `handle`, if attached.
    pub fn parent(&self, handle: HostHandle) -> Option<HostHandle> {
        self.doc.lock().nodes.get(&handle).and_then(|n| n.parent)
    }

    /// Attribute value on `handle`.
    pub fn attribute(&self, handle: HostHandle, name: &str) -> Option<String> {
        self.doc
            .lock()
            .nodes
            .get(&handle)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    /// Own text of `handle`.
    pub fn text(&self, handle: HostHandle) -> Option<String> {
        self.doc.lock().nodes.get(&handle).map(|n| n.text.clone())
    }

    /// Whether `handle` listens for `event`.
    pub fn has_listener(&self, handle: HostHandle, event: &str) -> bool {
        self.doc
            .lock()
            .nodes
            .get(&handle)
            .is_some_and(|n| n.listeners.contains_key(event))
    }

    /// First element under `root` (depth first, `root` included) whose
    /// attribute `name` equals `value`.
    pub fn find_by_attribute(&self, root: HostHandle, name: &str, value: &str) -> Option<HostHandle> {
        let doc = self.doc.lock();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let node = doc.nodes.get(&handle)?;
            if node.attributes.get(name).is_some_and(|v| v == value) {
                return Some(handle);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Deliver `event` to the listener registered for its kind on `handle`.
    ///
    /// Returns whether a listener ran. The document lock is released before
    /// the listener is called, so listeners may dispatch state updates.
    pub fn dispatch_event(&self, handle: HostHandle, event: &Event) -> Result<bool, HostError> {
        let listener = self.doc.lock().node(handle)?.listeners.get(&event.kind).cloned();
        match listener {
            Some(listener) => {
                listener.call(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mutations recorded so far.
    pub fn ops(&self) -> Vec<HostOp> {
        self.doc.lock().ops.clone()
    }

    /// Forget recorded mutations.
    pub fn clear_ops(&self) {
        self.doc.lock().ops.clear();
    }

    /// Number of handles the document holds.
    ///
    /// Removed subtrees and children replaced by text content are freed.
    /// Handles that were created but never attached stay until the host is
    /// dropped.
    pub fn node_count(&self) -> usize {
        self.doc.lock().nodes.len()
    }
}

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str) -> Result<HostHandle, HostError> {
        let mut doc = self.doc.lock();
        let handle = doc.insert(HostNode::new(NodeKind::Element(tag.to_string()), String::new()));
        doc.record(HostOp::CreateElement {
            handle,
            tag: tag.to_string(),
        });
        Ok(handle)
    }

    fn create_text(&mut self, text: &str) -> Result<HostHandle, HostError> {
        let mut doc = self.doc.lock();
        let handle = doc.insert(HostNode::new(NodeKind::Text, text.to_string()));
        doc.record(HostOp::CreateText {
            handle,
            text: text.to_string(),
        });
        Ok(handle)
    }

    fn set_property(
        &mut self,
        handle: HostHandle,
        name: &str,
        value: Option<&PropValue>,
    ) -> Result<(), HostError> {
        let mut doc = self.doc.lock();
        let node = doc.element_mut(handle)?;
        match (event_name(name), value) {
            (Some(event), Some(PropValue::Listener(listener))) => {
                node.listeners.insert(event, listener.clone());
            }
            (Some(event), None) => {
                node.listeners.shift_remove(&event);
                node.attributes.shift_remove(name);
            }
            (_, Some(value)) => {
                if let Some(text) = value.to_attribute() {
                    node.attributes.insert(name.to_string(), text);
                }
            }
            (None, None) => {
                node.attributes.shift_remove(name);
            }
        }
        doc.record(HostOp::SetProperty {
            handle,
            name: name.to_string(),
            removed: value.is_none(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError> {
        let mut doc = self.doc.lock();
        doc.element_mut(parent)?;
        doc.detach(child)?;
        doc.element_mut(parent)?.children.push(child);
        doc.node_mut(child)?.parent = Some(parent);
        doc.record(HostOp::AppendChild { parent, child });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
        reference: HostHandle,
    ) -> Result<(), HostError> {
        let mut doc = self.doc.lock();
        if !doc.element_mut(parent)?.children.contains(&reference) {
            return Err(HostError::NotAChild {
                parent,
                child: reference,
            });
        }
        doc.detach(child)?;
        let siblings = &mut doc.element_mut(parent)?.children;
        let position = siblings
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(siblings.len());
        siblings.insert(position, child);
        doc.node_mut(child)?.parent = Some(parent);
        doc.record(HostOp::InsertBefore {
            parent,
            child,
            reference,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError> {
        let mut doc = self.doc.lock();
        if !doc.element_mut(parent)?.children.contains(&child) {
            return Err(HostError::NotAChild { parent, child });
        }
        doc.detach(child)?;
        doc.discard(child);
        doc.record(HostOp::RemoveChild { parent, child });
        Ok(())
    }

    fn set_text_content(&mut self, handle: HostHandle, text: &str) -> Result<(), HostError> {
        let mut doc = self.doc.lock();
        let children = std::mem::take(&mut doc.node_mut(handle)?.children);
        for child in children {
            doc.discard(child);
        }
        doc.node_mut(handle)?.text = text.to_string();
        doc.record(HostOp::SetTextContent {
            handle,
            text: text.to_string(),
        });
        Ok(())
    }
}
