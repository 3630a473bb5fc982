//! Child-List Reconciliation
//!
//! Matches a parent's next declared children against the children of its
//! previous version, producing a fresh sibling chain of work nodes, flags for
//! the committer, and the list of old children to delete.
//!
//! # Algorithm
//!
//! 1. Lockstep: walk the old chain and the new sequence together while each
//!    pair has equal type and key. Pairs are reused in place.
//!
//! 2. New sequence exhausted: every remaining old child is deleted.
//!
//! 3. Old chain exhausted (always the case on mount): every remaining new
//!    child is created and flagged for placement.
//!
//! 4. Otherwise the remaining old children go into a map keyed by `key`, or
//!    by position for unkeyed children. Each remaining new child takes its
//!    match out of the map or is created. Old children left in the map are
//!    deleted.
//!
//! Move detection follows the `last_placed` rule: a reused child whose old
//! position is behind the furthest position kept so far must move. In step 4
//! the reused children that pass that rule keep their host position only if
//! they belong to the longest run of increasing old positions; the rest are
//! flagged as moved. Moving one item to the front of a list therefore moves
//! that item alone.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::element::{Children, Element, Key};
use crate::error::RenderError;
use crate::fiber::{FiberArena, FiberId, Flags, WorkNode};

/// Lookup key for unmatched old children in the keyed fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SlotKey {
    Key(Key),
    Index(usize),
}

impl SlotKey {
    fn of(key: Option<&Key>, index: usize) -> Self {
        match key {
            Some(key) => SlotKey::Key(key.clone()),
            None => SlotKey::Index(index),
        }
    }
}

/// Builds the new sibling chain under one parent.
struct ChainBuilder {
    parent: FiberId,
    first: Option<FiberId>,
    last: Option<FiberId>,
}

impl ChainBuilder {
    fn new(parent: FiberId) -> Self {
        Self {
            parent,
            first: None,
            last: None,
        }
    }

    fn push(&mut self, arena: &mut FiberArena, id: FiberId) -> Result<(), RenderError> {
        match self.last {
            Some(last) => arena.node_mut(last)?.sibling = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        Ok(())
    }

    fn finish(self, arena: &mut FiberArena) -> Result<(), RenderError> {
        arena.node_mut(self.parent)?.child = self.first;
        Ok(())
    }
}

/// Reconcile `children` under `parent`.
///
/// A single primitive is left alone: a host primitive renders it as its own
/// text content.
pub(crate) fn reconcile_children(
    arena: &mut FiberArena,
    parent: FiberId,
    children: Children,
) -> Result<(), RenderError> {
    let next: Vec<Option<Element>> = match children {
        Children::Text(_) => return Ok(()),
        Children::Empty => Vec::new(),
        Children::Nodes(nodes) => nodes,
    };

    let mut old = arena
        .node(parent)?
        .alternate
        .and_then(|alternate| arena.get(alternate))
        .and_then(|previous| previous.child);

    let mut chain = ChainBuilder::new(parent);
    let mut last_placed = 0;
    let mut index = 0;

    // 1. lockstep
    while let Some(old_id) = old {
        if index >= next.len() {
            break;
        }
        let old_node = arena.node(old_id)?;
        if old_node.index > index {
            break;
        }
        let Some(element) = next[index].as_ref() else {
            break;
        };
        if !old_node.matches(element) {
            break;
        }
        let following = old_node.sibling;
        let old_index = old_node.index;

        let id = reuse(arena, parent, old_id, element, index)?;
        last_placed = place_child(arena.node_mut(id)?, Some(old_index), last_placed);
        chain.push(arena, id)?;

        old = following;
        index += 1;
    }

    // 2. new exhausted
    if index >= next.len() {
        while let Some(old_id) = old {
            old = arena.node(old_id)?.sibling;
            delete_child(arena, parent, old_id)?;
        }
        return chain.finish(arena);
    }

    // 3. old exhausted
    if old.is_none() {
        for (index, element) in next.iter().enumerate().skip(index) {
            let Some(element) = element else { continue };
            let id = create(arena, parent, element, index);
            place_child(arena.node_mut(id)?, None, last_placed);
            chain.push(arena, id)?;
        }
        return chain.finish(arena);
    }

    // 4. keyed fallback
    let mut remaining: IndexMap<SlotKey, FiberId> = IndexMap::new();
    while let Some(old_id) = old {
        let node = arena.node(old_id)?;
        remaining.insert(SlotKey::of(node.key.as_ref(), node.index), old_id);
        old = node.sibling;
    }

    let mut kept: SmallVec<[(FiberId, usize); 16]> = SmallVec::new();
    for (index, element) in next.iter().enumerate().skip(index) {
        let Some(element) = element else { continue };

        let matched = match remaining.get(&SlotKey::of(element.key(), index)) {
            Some(&old_id) if arena.node(old_id)?.matches(element) => Some(old_id),
            _ => None,
        };

        let id = match matched {
            Some(old_id) => {
                remaining.shift_remove(&SlotKey::of(element.key(), index));
                let old_index = arena.node(old_id)?.index;
                let id = reuse(arena, parent, old_id, element, index)?;
                if old_index < last_placed {
                    place_child(arena.node_mut(id)?, Some(old_index), last_placed);
                } else {
                    kept.push((id, old_index));
                }
                id
            }
            None => {
                let id = create(arena, parent, element, index);
                place_child(arena.node_mut(id)?, None, last_placed);
                id
            }
        };
        chain.push(arena, id)?;
    }

    let old_positions: SmallVec<[usize; 16]> = kept.iter().map(|&(_, old_index)| old_index).collect();
    let stable = longest_increasing(&old_positions);
    for (&(id, _), stays) in kept.iter().zip(stable) {
        if !stays {
            arena.node_mut(id)?.flags.insert(Flags::PLACEMENT);
        }
    }

    for (_, old_id) in remaining {
        delete_child(arena, parent, old_id)?;
    }
    chain.finish(arena)
}

/// Apply the move rule to a placed child and return the new `last_placed`.
///
/// New children are always placed. A reused child whose old position is
/// behind `last_placed` moves; otherwise it stays and advances `last_placed`.
fn place_child(node: &mut WorkNode, old_index: Option<usize>, last_placed: usize) -> usize {
    match old_index {
        None => {
            node.flags = Flags::PLACEMENT;
            last_placed
        }
        Some(old_index) if old_index < last_placed => {
            node.flags.insert(Flags::PLACEMENT);
            last_placed
        }
        Some(old_index) => old_index,
    }
}

fn create(arena: &mut FiberArena, parent: FiberId, element: &Element, index: usize) -> FiberId {
    let mut node = WorkNode::from_element(element, parent);
    node.index = index;
    arena.insert(node)
}

/// New version of `old_id` for `element`, keeping its host state.
fn reuse(
    arena: &mut FiberArena,
    parent: FiberId,
    old_id: FiberId,
    element: &Element,
    index: usize,
) -> Result<FiberId, RenderError> {
    let old = arena.node(old_id)?;
    let mut node = WorkNode::from_element(element, parent);
    node.state_node = old.state_node.clone();
    node.alternate = Some(old_id);
    node.flags = Flags::UPDATE;
    node.index = index;

    let id = arena.insert(node);
    arena.node_mut(old_id)?.alternate = Some(id);
    Ok(id)
}

fn delete_child(arena: &mut FiberArena, parent: FiberId, old_id: FiberId) -> Result<(), RenderError> {
    tracing::trace!(parent = parent.raw(), child = old_id.raw(), "child marked for deletion");
    arena.node_mut(parent)?.deletions.push(old_id);
    Ok(())
}

/// Membership of each position in one longest strictly increasing
/// subsequence of `values`.
fn longest_increasing(values: &[usize]) -> Vec<bool> {
    // tails[k]: position of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];

    for (position, &value) in values.iter().enumerate() {
        let length = tails.partition_point(|&tail| values[tail] < value);
        if length > 0 {
            previous[position] = Some(tails[length - 1]);
        }
        if length == tails.len() {
            tails.push(position);
        } else {
            tails[length] = position;
        }
    }

    let mut members = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        members[position] = true;
        cursor = previous[position];
    }
    members
}
