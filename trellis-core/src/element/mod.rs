//! Tree Descriptions
//!
//! An [`Element`] is an immutable description of one desired UI node. A fresh
//! tree of elements is produced on every render pass; the reconciler compares
//! it against the previous work-node tree and decides what to reuse.
//!
//! # Node kinds
//!
//! - a host tag (`"div"`) maps to a host primitive,
//! - a [`FunctionComponent`] renders by direct invocation,
//! - a [`ClassComponent`] renders through an instance,
//! - text (no type) carries its raw value as `props.children`,
//! - a fragment groups children without a host node of its own.
//!
//! Props are stored behind an `Arc` so work nodes and the render loop can hold
//! on to them without deep copies.

mod component;
mod props;

pub use component::{ClassComponent, Component, FunctionComponent, RenderResult};
pub(crate) use component::Instance;
pub use props::{event_name, Event, Listener, PropValue, Props};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a child among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(String);

impl Key {
    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key(value.to_string())
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key(value.to_string())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key(value.to_string())
    }
}

/// The `type` of a tree-description node.
#[derive(Debug, Clone)]
pub enum ElementType {
    /// A host primitive, named by its tag.
    Host(String),
    Function(FunctionComponent),
    Class(ClassComponent),
    /// Plain text or a number; the value lives in `props.children`.
    Text,
    Fragment,
}

impl ElementType {
    /// Human-readable type name used in logs and snapshots.
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Function(component) => component.name(),
            ElementType::Class(component) => component.name(),
            ElementType::Text => "#text",
            ElementType::Fragment => "#fragment",
        }
    }
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ElementType::Host(a), ElementType::Host(b)) => a == b,
            (ElementType::Function(a), ElementType::Function(b)) => a == b,
            (ElementType::Class(a), ElementType::Class(b)) => a == b,
            (ElementType::Text, ElementType::Text) => true,
            (ElementType::Fragment, ElementType::Fragment) => true,
            _ => false,
        }
    }
}

/// Children of an element, or the output of a component render.
#[derive(Debug, Clone, Default)]
pub enum Children {
    #[default]
    Empty,
    /// A single primitive (string or number).
    Text(String),
    /// An ordered sequence; `None` entries are holes left by conditional
    /// rendering and keep their position index.
    Nodes(Vec<Option<Element>>),
}

impl Children {
    /// The primitive value, if these children are a single primitive.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether there is nothing to render.
    pub fn is_empty(&self) -> bool {
        match self {
            Children::Empty => true,
            Children::Text(_) => false,
            Children::Nodes(nodes) => nodes.is_empty(),
        }
    }

    /// Component and fragment output: a lone primitive becomes a text node so
    /// it reaches the host tree.
    pub(crate) fn into_rendered(self) -> Children {
        match self {
            Children::Text(text) => Children::Nodes(vec![Some(Element::text(text))]),
            other => other,
        }
    }

    fn push(&mut self, element: Element) {
        match self {
            Children::Empty => *self = Children::Nodes(vec![Some(element)]),
            Children::Text(text) => {
                let text = Element::text(std::mem::take(text));
                *self = Children::Nodes(vec![Some(text), Some(element)]);
            }
            Children::Nodes(nodes) => nodes.push(Some(element)),
        }
    }
}

impl From<Element> for Children {
    fn from(element: Element) -> Self {
        Children::Nodes(vec![Some(element)])
    }
}

impl From<Option<Element>> for Children {
    fn from(element: Option<Element>) -> Self {
        Children::Nodes(vec![element])
    }
}

impl From<Vec<Element>> for Children {
    fn from(elements: Vec<Element>) -> Self {
        Children::Nodes(elements.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<Element>>> for Children {
    fn from(elements: Vec<Option<Element>>) -> Self {
        Children::Nodes(elements)
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(text.to_string())
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(text)
    }
}

impl From<i64> for Children {
    fn from(value: i64) -> Self {
        Children::Text(value.to_string())
    }
}

impl From<i32> for Children {
    fn from(value: i32) -> Self {
        Children::Text(value.to_string())
    }
}

/// Immutable description of a desired UI node.
#[derive(Debug, Clone)]
pub struct Element {
    ty: ElementType,
    key: Option<Key>,
    props: Arc<Props>,
}

impl Element {
    fn new(ty: ElementType, props: Props) -> Self {
        Self {
            ty,
            key: None,
            props: Arc::new(props),
        }
    }

    /// A host primitive with the given tag.
    pub fn host(tag: impl Into<String>) -> Self {
        Self::new(ElementType::Host(tag.into()), Props::new())
    }

    /// A plain text node.
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(ElementType::Text, Props::text(value))
    }

    /// A fragment grouping `children` without a host node of its own.
    pub fn fragment(children: impl Into<Children>) -> Self {
        let mut props = Props::new();
        props.set_children(children);
        Self::new(ElementType::Fragment, props)
    }

    /// An element rendering a function component.
    pub fn function(component: &FunctionComponent) -> Self {
        Self::new(component.into(), Props::new())
    }

    /// An element rendering a class component.
    pub fn class(component: &ClassComponent) -> Self {
        Self::new(component.into(), Props::new())
    }

    /// Set the reconciliation key.
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a prop.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        Arc::make_mut(&mut self.props).insert(name, value);
        self
    }

    /// Append one child element.
    pub fn child(mut self, child: Element) -> Self {
        Arc::make_mut(&mut self.props).children_mut().push(child);
        self
    }

    /// Replace the children.
    pub fn children(mut self, children: impl Into<Children>) -> Self {
        Arc::make_mut(&mut self.props).set_children(children);
        self
    }

    /// The element type.
    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    /// The reconciliation key, if any.
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The props, including children.
    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn shared_props(&self) -> Arc<Props> {
        Arc::clone(&self.props)
    }
}
