//! Work-Node Arena
//!
//! Owns every work-node version that is still reachable: the current tree,
//! the tree being built, and nodes queued for deletion. After a commit the
//! arena is swept down to the current tree.

use std::collections::{HashMap, HashSet};

use super::node::{FiberId, WorkNode};
use crate::error::RenderError;

/// Storage for work nodes, indexed by id.
#[derive(Debug, Default)]
pub struct FiberArena {
    nodes: HashMap<FiberId, WorkNode>,
}

impl FiberArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena.
    pub fn insert(&mut self, node: WorkNode) -> FiberId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Look up a node by id.
    pub fn get(&self, id: FiberId) -> Option<&WorkNode> {
        self.nodes.get(&id)
    }

    /// Look up a node by id for mutation.
    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut WorkNode> {
        self.nodes.get_mut(&id)
    }

    /// Like [`get`](Self::get), for links that must resolve.
    pub fn node(&self, id: FiberId) -> Result<&WorkNode, RenderError> {
        self.nodes.get(&id).ok_or(RenderError::MissingNode(id))
    }

    /// Like [`get_mut`](Self::get_mut), for links that must resolve.
    pub fn node_mut(&mut self, id: FiberId) -> Result<&mut WorkNode, RenderError> {
        self.nodes.get_mut(&id).ok_or(RenderError::MissingNode(id))
    }

    /// Whether `id` is stored.
    pub fn contains(&self, id: FiberId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every stored node, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = FiberId> + '_ {
        self.nodes.keys().copied()
    }

    /// Children of `id` in sibling order.
    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|n| n.child);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.get(child).and_then(|n| n.sibling);
        }
        out
    }

    /// Drop every node not reachable from `root` through child/sibling links.
    ///
    /// Surviving nodes lose their alternate and pending deletions: both point
    /// at retired versions.
    pub fn retain_reachable(&mut self, root: FiberId) -> usize {
        let mut live = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !live.insert(id) {
                continue;
            }
            // the root's own sibling is outside its tree
            if id != root {
                stack.extend(node.sibling);
            }
            stack.extend(node.child);
        }

        let before = self.nodes.len();
        self.nodes.retain(|id, _| live.contains(id));
        for node in self.nodes.values_mut() {
            node.alternate = None;
            node.deletions.clear();
        }
        before - self.nodes.len()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
