//! Work Nodes
//!
//! A work node is the mutable reconciliation unit for one position in the UI
//! tree. Links between nodes are [`FiberId`]s into the owning arena rather
//! than pointers, so the current/alternate pair is two arena entries that
//! name each other instead of a reference cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use serde::Serialize;

use crate::element::{Element, ElementType, Instance, Key, Props};
use crate::hooks::{EffectQueue, HookListRef, SlotPatch};
use crate::host::HostHandle;

/// Unique identifier for a work node version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FiberId(u64);

impl FiberId {
    /// Generate a new unique id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric value of the id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for FiberId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of work node, fixed at creation from the element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkTag {
    HostPrimitive,
    Function,
    Class,
    Fragment,
    Text,
}

impl From<&ElementType> for WorkTag {
    fn from(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(_) => WorkTag::HostPrimitive,
            ElementType::Function(_) => WorkTag::Function,
            ElementType::Class(_) => WorkTag::Class,
            ElementType::Text => WorkTag::Text,
            ElementType::Fragment => WorkTag::Fragment,
        }
    }
}

bitflags! {
    /// Pending host work computed by reconciliation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        /// Insert, or move to its new position.
        const PLACEMENT = 1 << 0;
        /// Reused; props must be diffed onto the existing handle.
        const UPDATE = 1 << 1;
    }
}

/// What a work node owns on the host side.
#[derive(Clone, Default)]
pub enum StateNode {
    #[default]
    None,
    /// A materialized host element or text handle.
    Host(HostHandle),
    /// A class-component instance.
    Instance(Instance),
}

impl StateNode {
    /// The host handle, if this is one.
    pub fn host_handle(&self) -> Option<HostHandle> {
        match self {
            StateNode::Host(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl std::fmt::Debug for StateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateNode::None => f.write_str("None"),
            StateNode::Host(handle) => f.debug_tuple("Host").field(handle).finish(),
            StateNode::Instance(_) => f.write_str("Instance"),
        }
    }
}

/// One version of a node in the work tree.
#[derive(Debug)]
pub struct WorkNode {
    id: FiberId,
    pub tag: WorkTag,
    pub key: Option<Key>,
    pub ty: ElementType,
    pub props: Arc<Props>,
    pub state_node: StateNode,

    /// Parent (`return`).
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// Position within the sibling run, used to detect moves.
    pub index: usize,

    /// The other version of this logical node.
    pub alternate: Option<FiberId>,
    pub flags: Flags,
    /// Old children to remove when this node commits.
    pub deletions: Vec<FiberId>,

    /// Hook slots of a function component; shared with the alternate.
    pub hooks: Option<HookListRef>,
    pub layout_effects: EffectQueue,
    pub passive_effects: EffectQueue,
    /// Hook slot writes of the last render, applied at commit.
    pub(crate) slot_patch: Option<SlotPatch>,
}

impl WorkNode {
    fn blank(tag: WorkTag, ty: ElementType, key: Option<Key>, props: Arc<Props>) -> Self {
        Self {
            id: FiberId::new(),
            tag,
            key,
            ty,
            props,
            state_node: StateNode::None,
            parent: None,
            child: None,
            sibling: None,
            index: 0,
            alternate: None,
            flags: Flags::PLACEMENT,
            deletions: Vec::new(),
            hooks: None,
            layout_effects: EffectQueue::new(),
            passive_effects: EffectQueue::new(),
            slot_patch: None,
        }
    }

    /// Create a work node for a tree-description node under `parent`.
    ///
    /// New nodes assume insertion (`PLACEMENT`) and have no alternate.
    pub fn from_element(element: &Element, parent: FiberId) -> Self {
        let ty = element.ty().clone();
        let mut node = Self::blank(
            WorkTag::from(&ty),
            ty,
            element.key().cloned(),
            element.shared_props(),
        );
        node.parent = Some(parent);
        node
    }

    /// The node standing for the host container a root renders into.
    pub fn container(tag: &str, handle: HostHandle, props: Props) -> Self {
        let mut node = Self::blank(
            WorkTag::HostPrimitive,
            ElementType::Host(tag.to_string()),
            None,
            Arc::new(props),
        );
        node.state_node = StateNode::Host(handle);
        node.flags = Flags::empty();
        node
    }

    /// Shallow copy used to re-render this node in isolation: same type,
    /// props and host state, no children and no sibling, with `self` as the
    /// alternate.
    pub fn clone_for_update(&self) -> Self {
        let mut node = Self::blank(self.tag, self.ty.clone(), self.key.clone(), Arc::clone(&self.props));
        node.state_node = self.state_node.clone();
        node.parent = self.parent;
        node.index = self.index;
        node.alternate = Some(self.id);
        node.flags = Flags::UPDATE;
        node
    }

    /// The id of this version.
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// The host handle this node owns, if any.
    pub fn host_handle(&self) -> Option<HostHandle> {
        self.state_node.host_handle()
    }

    /// Whether `element` can be rendered by reusing this node.
    pub fn matches(&self, element: &Element) -> bool {
        self.ty == *element.ty() && self.key.as_ref() == element.key()
    }
}
