//! Effect Queues and Dependency Lists
//!
//! Effects are captured during render and fired during commit. Whether an
//! effect is queued again on a later render depends on its dependency list:
//!
//! - no list: queued on every render,
//! - empty list: queued on mount only,
//! - otherwise: queued when any element differs from the previous render.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// Which commit queue an effect goes to. Layout effects fire before passive
/// effects of the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTag {
    Layout,
    Passive,
}

impl EffectTag {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            EffectTag::Layout => "layout effect",
            EffectTag::Passive => "effect",
        }
    }
}

trait DepValue: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn same(&self, other: &dyn DepValue) -> bool;
}

impl<T> DepValue for T
where
    T: PartialEq + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same(&self, other: &dyn DepValue) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }
}

/// One element of a dependency list.
#[derive(Clone)]
pub struct Dep(Arc<dyn DepValue>);

impl Dep {
    /// Wrap a value for comparison.
    pub fn new<T>(value: T) -> Self
    where
        T: PartialEq + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().same(other.0.as_ref())
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dep")
    }
}

/// A dependency list. Elements compare by value and by type: `1i32` and
/// `1i64` are different dependencies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deps(SmallVec<[Dep; 4]>);

impl Deps {
    /// An empty dependency list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependency.
    pub fn with<T>(mut self, value: T) -> Self
    where
        T: PartialEq + Send + Sync + 'static,
    {
        self.push(value);
        self
    }

    /// Append a dependency in place.
    pub fn push<T>(&mut self, value: T)
    where
        T: PartialEq + Send + Sync + 'static,
    {
        self.0.push(Dep::new(value));
    }

    /// Number of dependencies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no dependencies.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build a [`Deps`] list: `deps![]`, `deps![count, name.clone()]`.
#[macro_export]
macro_rules! deps {
    () => {
        $crate::hooks::Deps::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::hooks::Deps::new()$(.with($value))+
    };
}

/// Whether an effect must be queued given the previous and next lists.
pub(crate) fn deps_changed(previous: Option<&Deps>, next: Option<&Deps>) -> bool {
    match (previous, next) {
        (Some(previous), Some(next)) => previous != next,
        _ => true,
    }
}

/// An effect waiting for its node to commit.
pub struct QueuedEffect {
    tag: EffectTag,
    callback: Box<dyn FnOnce() + Send>,
}

impl QueuedEffect {
    pub(crate) fn new(tag: EffectTag, callback: Box<dyn FnOnce() + Send>) -> Self {
        Self { tag, callback }
    }

    /// Layout or passive.
    pub fn tag(&self) -> EffectTag {
        self.tag
    }

    pub(crate) fn run(self) {
        (self.callback)()
    }
}

impl fmt::Debug for QueuedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedEffect").field("tag", &self.tag).finish()
    }
}

/// Effects queued on a work node, in the order they were declared.
pub type EffectQueue = Vec<QueuedEffect>;
