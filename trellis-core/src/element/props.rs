//! Props
//!
//! Attributes, listeners and children carried by a tree-description node.
//! Attribute order is preserved so host mutations happen in declaration order.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Children;

/// An event delivered to a [`Listener`] by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name without the `on` prefix, lowercased (`"click"`).
    pub kind: String,

    /// Platform payload.
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl Event {
    /// Create an event of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: serde_json::Value::Null,
        }
    }

    /// Attach a JSON payload.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// An event callback attached through an `on*` prop.
///
/// Listeners compare by identity: two listeners are equal only if they are
/// clones of the same callback.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&Event) + Send + Sync>);

impl Listener {
    /// Wrap a callback. Each call yields a new identity.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0))
    }
}

/// The value of a single prop.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Listener(Listener),
}

impl PropValue {
    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The listener, if this is one.
    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            PropValue::Listener(l) => Some(l),
            _ => None,
        }
    }

    /// Render a non-listener value the way a host writes it into an attribute.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Str(s) => Some(s.clone()),
            PropValue::Int(i) => Some(i.to_string()),
            PropValue::Float(x) => Some(x.to_string()),
            PropValue::Bool(b) => Some(b.to_string()),
            PropValue::Listener(_) => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Listener> for PropValue {
    fn from(value: Listener) -> Self {
        PropValue::Listener(value)
    }
}

/// Returns the event name for a listener prop key (`onClick` -> `click`).
pub fn event_name(key: &str) -> Option<String> {
    key.strip_prefix("on")
        .filter(|rest| !rest.is_empty())
        .map(str::to_lowercase)
}

/// Props of a tree-description node.
#[derive(Debug, Clone, Default)]
pub struct Props {
    attrs: IndexMap<String, PropValue>,
    children: Children,
}

impl Props {
    /// Create empty props with no children.
    pub fn new() -> Self {
        Self::default()
    }

    /// Props of a text node: no attributes, the raw value as children.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            attrs: IndexMap::new(),
            children: Children::Text(value.into()),
        }
    }

    /// Look up a prop by name.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs.get(name)
    }

    /// A string prop.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    /// An integer prop.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropValue::as_int)
    }

    /// A boolean prop.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropValue::as_bool)
    }

    /// A listener prop.
    pub fn listener(&self, name: &str) -> Option<&Listener> {
        self.get(name).and_then(PropValue::as_listener)
    }

    /// Attributes and listeners in declaration order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The declared children.
    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Set a prop, keeping its original position if it exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Replace the declared children.
    pub fn set_children(&mut self, children: impl Into<Children>) {
        self.children = children.into();
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children {
        &mut self.children
    }
}
