//! Hook Slots
//!
//! A function component's hooks live in an ordered slot list. Slot *n* of a
//! render corresponds to slot *n* of the previous render of the same node.
//! Both versions of a work node share one list, so a dispatch that writes a
//! slot is seen by whichever version renders next.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::effect::{Deps, EffectTag};
use crate::fiber::FiberId;

/// Shared handle to a node's slot list.
pub type HookListRef = Arc<Mutex<HookList>>;

/// A single hook cell.
pub(crate) enum HookSlot {
    State {
        type_id: TypeId,
        type_name: &'static str,
        value: Box<dyn Any + Send>,
    },
    Effect {
        tag: EffectTag,
        deps: Option<Deps>,
    },
}

impl HookSlot {
    pub(crate) fn state<S: Send + 'static>(value: S) -> Self {
        HookSlot::State {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            value: Box::new(value),
        }
    }

    pub(crate) fn holds<S: 'static>(&self) -> bool {
        matches!(self, HookSlot::State { type_id, .. } if *type_id == TypeId::of::<S>())
    }

    pub(crate) fn is_effect(&self, expected: EffectTag) -> bool {
        matches!(self, HookSlot::Effect { tag, .. } if *tag == expected)
    }

    pub(crate) fn state_ref<S: 'static>(&self) -> Option<&S> {
        match self {
            HookSlot::State { value, .. } => value.downcast_ref::<S>(),
            HookSlot::Effect { .. } => None,
        }
    }

    pub(crate) fn state_mut<S: 'static>(&mut self) -> Option<&mut S> {
        match self {
            HookSlot::State { value, .. } => value.downcast_mut::<S>(),
            HookSlot::Effect { .. } => None,
        }
    }

    /// Short name for hook-order diagnostics.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            HookSlot::State { type_name, .. } => type_name,
            HookSlot::Effect { tag, .. } => tag.describe(),
        }
    }
}

/// The slot list of one logical function component.
pub struct HookList {
    /// The work node that rendered this list most recently.
    pub(crate) owner: FiberId,
    pub(crate) slots: Vec<HookSlot>,
}

impl HookList {
    pub(crate) fn new(owner: FiberId) -> Self {
        Self {
            owner,
            slots: Vec::new(),
        }
    }

    /// The work node that last committed this list.
    pub fn owner(&self) -> FiberId {
        self.owner
    }

    /// Number of hook slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the list holds no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Replace the slot at `index`, or append when `index` is the end.
    pub(crate) fn put(&mut self, index: usize, slot: HookSlot) {
        if index < self.slots.len() {
            self.slots[index] = slot;
        } else {
            self.slots.push(slot);
        }
    }
}

/// Slot writes a render made against an already committed list.
///
/// They stay here until the rendering node commits, so an abandoned pass
/// leaves the committed slots as they were.
pub(crate) struct SlotPatch {
    owner: FiberId,
    writes: Vec<(usize, HookSlot)>,
    truncate: Option<usize>,
}

impl SlotPatch {
    pub(crate) fn new(owner: FiberId) -> Self {
        Self {
            owner,
            writes: Vec::new(),
            truncate: None,
        }
    }

    pub(crate) fn write(&mut self, index: usize, slot: HookSlot) {
        self.writes.push((index, slot));
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.truncate = Some(len);
    }

    /// Write every staged slot into `list` and make the rendering node its
    /// owner.
    pub(crate) fn apply(self, list: &mut HookList) {
        for (index, slot) in self.writes {
            list.put(index, slot);
        }
        if let Some(len) = self.truncate {
            list.slots.truncate(len);
        }
        list.owner = self.owner;
    }
}

impl fmt::Debug for SlotPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<_> = self.writes.iter().map(|(index, _)| *index).collect();
        f.debug_struct("SlotPatch")
            .field("owner", &self.owner)
            .field("writes", &indices)
            .field("truncate", &self.truncate)
            .finish()
    }
}

impl fmt::Debug for HookList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.slots.iter().map(HookSlot::describe).collect();
        f.debug_struct("HookList")
            .field("owner", &self.owner)
            .field("slots", &kinds)
            .finish()
    }
}
