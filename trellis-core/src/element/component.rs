//! Component Types
//!
//! Function components render by direct invocation and may call hooks.
//! Class components are instantiated once per work-node identity and render
//! through a method on that instance.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Children, Element, ElementType, Props};
use crate::error::RenderError;
use crate::hooks::Hooks;

/// What a component render returns.
pub type RenderResult = Result<Children, RenderError>;

type RenderFn = dyn Fn(&Props, &mut Hooks) -> RenderResult + Send + Sync;

/// A component rendered by calling a function with its props.
///
/// Identity is the function allocation: clone a `FunctionComponent` to reuse
/// it across renders, since two separately constructed components never
/// compare equal even if they wrap the same code.
#[derive(Clone)]
pub struct FunctionComponent {
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl FunctionComponent {
    /// Create a function component from its render closure.
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Props, &mut Hooks) -> RenderResult + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            render: Arc::new(render),
        }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A tree-description node of this component with empty props.
    pub fn element(&self) -> Element {
        Element::function(self)
    }

    pub(crate) fn render(&self, props: &Props, hooks: &mut Hooks) -> RenderResult {
        (self.render)(props, hooks)
    }
}

impl PartialEq for FunctionComponent {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for FunctionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionComponent").field(&self.name).finish()
    }
}

/// Instance side of a class component.
pub trait Component: Send {
    fn render(&mut self, props: &Props) -> RenderResult;
}

/// A live class-component instance, shared by both versions of its work node.
pub(crate) type Instance = Arc<Mutex<Box<dyn Component>>>;

type ConstructFn = dyn Fn(&Props) -> Box<dyn Component> + Send + Sync;

/// A component rendered through an instance method.
#[derive(Clone)]
pub struct ClassComponent {
    name: Arc<str>,
    construct: Arc<ConstructFn>,
}

impl ClassComponent {
    /// Create a class component from a constructor run once per mounted instance.
    pub fn new<C, F>(name: &str, construct: F) -> Self
    where
        C: Component + 'static,
        F: Fn(&Props) -> C + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            construct: Arc::new(move |props| Box::new(construct(props)) as Box<dyn Component>),
        }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// An element rendering this component.
    pub fn element(&self) -> Element {
        Element::class(self)
    }

    pub(crate) fn instantiate(&self, props: &Props) -> Instance {
        Arc::new(Mutex::new((self.construct)(props)))
    }
}

impl PartialEq for ClassComponent {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.construct, &other.construct)
    }
}

impl fmt::Debug for ClassComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassComponent").field(&self.name).finish()
    }
}

impl From<&FunctionComponent> for ElementType {
    fn from(component: &FunctionComponent) -> Self {
        ElementType::Function(component.clone())
    }
}

impl From<&ClassComponent> for ElementType {
    fn from(component: &ClassComponent) -> Self {
        ElementType::Class(component.clone())
    }
}
