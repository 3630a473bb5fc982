//! Reconciler
//!
//! The [`Renderer`] owns everything one root needs to turn tree descriptions
//! into host mutations: the work-node arena, the host adapter, the container
//! handle and the pointer to the committed ("current") tree.
//!
//! # Passes
//!
//! A pass is a render phase followed by a commit phase, always run to
//! completion while the renderer is locked:
//!
//! 1. **Root render**: a new container node takes the previous root as its
//!    alternate, and the whole tree is walked.
//!
//! 2. **Hook update**: the component owning a dispatched state slot is
//!    copied into a fresh version with its sibling link severed, so the walk
//!    covers that component's subtree only. The copy is spliced back into its
//!    parent's child chain before commit.
//!
//! After a successful commit the arena is swept down to the current tree. A
//! failed render is abandoned: nothing is committed and the work nodes it
//! created are dropped.

mod child;
mod commit;
mod work_loop;

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::RootConfig;
use crate::element::{Children, Key, Props};
use crate::error::RenderError;
use crate::fiber::{FiberArena, FiberId, WorkNode, WorkTag};
use crate::hooks::{HookList, ScheduleUpdate};
use crate::host::{Host, HostHandle};

/// What one commit did to the host tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Keys of nodes inserted or moved, in commit order.
    pub placed: Vec<Option<Key>>,
    /// Keys of reused nodes, in commit order.
    pub updated: Vec<Option<Key>>,
    /// Keys of removed subtrees.
    pub deleted: Vec<Option<Key>>,
    pub effects_fired: usize,
}

impl CommitSummary {
    /// Keys of placed nodes, skipping unkeyed ones.
    pub fn placed_keys(&self) -> Vec<&str> {
        self.placed.iter().flatten().map(Key::as_str).collect()
    }

    /// Keys of updated nodes, skipping unkeyed ones.
    pub fn updated_keys(&self) -> Vec<&str> {
        self.updated.iter().flatten().map(Key::as_str).collect()
    }

    /// Keys of deleted nodes, skipping unkeyed ones.
    pub fn deleted_keys(&self) -> Vec<&str> {
        self.deleted.iter().flatten().map(Key::as_str).collect()
    }
}

/// Serializable view of the committed work tree.
#[derive(Debug, Clone, Serialize)]
pub struct FiberSnapshot {
    pub id: FiberId,
    pub tag: WorkTag,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostHandle>,
    /// Hook slots held by a function component.
    pub hooks: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FiberSnapshot>,
}

/// Render and commit machinery for one root.
pub struct Renderer {
    arena: FiberArena,
    host: Box<dyn Host>,
    container: HostHandle,
    /// Root of the committed tree.
    current: Option<FiberId>,
    /// Root of the pass in progress, cleared once it commits.
    work_in_progress_root: Option<FiberId>,
    config: RootConfig,
    schedule_update: ScheduleUpdate,
    last_commit: Option<CommitSummary>,
    last_error: Option<RenderError>,
}

impl Renderer {
    pub(crate) fn new(
        host: Box<dyn Host>,
        container: HostHandle,
        config: RootConfig,
        schedule_update: ScheduleUpdate,
    ) -> Self {
        Self {
            arena: FiberArena::new(),
            host,
            container,
            current: None,
            work_in_progress_root: None,
            config,
            schedule_update,
            last_commit: None,
            last_error: None,
        }
    }

    /// Render `children` into the container and commit.
    pub fn render_root(&mut self, children: Children) -> Result<CommitSummary, RenderError> {
        let mut props = Props::new();
        props.set_children(children.into_rendered());
        let mut root = WorkNode::container(&self.config.container_tag, self.container, props);
        root.alternate = self.current;
        let root = self.arena.insert(root);
        if let Some(previous) = self.current {
            self.arena.node_mut(previous)?.alternate = Some(root);
        }

        let outcome = self.render_and_commit(root, None);
        if outcome.is_ok() {
            self.current = Some(root);
        }
        self.settle(outcome)
    }

    /// Re-render the component that owns `hooks`, if it is still mounted.
    pub fn rerender_hook_owner(
        &mut self,
        hooks: Weak<Mutex<HookList>>,
    ) -> Result<Option<CommitSummary>, RenderError> {
        let Some(list) = hooks.upgrade() else {
            tracing::debug!("hook owner unmounted before its update ran");
            return Ok(None);
        };
        let Some(owner) = self.find_hook_owner(&list) else {
            tracing::warn!("update for a component that is no longer in the tree ignored");
            return Ok(None);
        };

        let copy = self.arena.node(owner)?.clone_for_update();
        let copy = self.arena.insert(copy);
        self.arena.node_mut(owner)?.alternate = Some(copy);
        tracing::trace!(owner = owner.raw(), copy = copy.raw(), "re-rendering hook owner");

        let outcome = self.render_and_commit(copy, Some(owner));
        self.settle(outcome).map(Some)
    }

    fn render_and_commit(
        &mut self,
        root: FiberId,
        replaces: Option<FiberId>,
    ) -> Result<CommitSummary, RenderError> {
        self.work_in_progress_root = Some(root);
        {
            let _span = tracing::debug_span!("render", root = root.raw()).entered();
            let units = self.perform(root)?;
            tracing::debug!(units, "render complete");
        }
        if let Some(previous) = replaces {
            self.splice(previous, root)?;
        }
        self.commit(root)
    }

    /// Record the outcome of a pass and sweep the arena.
    fn settle(
        &mut self,
        outcome: Result<CommitSummary, RenderError>,
    ) -> Result<CommitSummary, RenderError> {
        self.work_in_progress_root = None;
        let swept = match self.current {
            Some(current) => self.arena.retain_reachable(current),
            None => {
                let swept = self.arena.len();
                self.arena.clear();
                swept
            }
        };
        tracing::trace!(swept, live = self.arena.len(), "arena swept");

        match outcome {
            Ok(summary) => {
                self.last_commit = Some(summary.clone());
                self.last_error = None;
                Ok(summary)
            }
            Err(err) => {
                tracing::error!(error = %err, "render pass abandoned");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Put `replacement` where `previous` sits in its parent's child chain.
    fn splice(&mut self, previous: FiberId, replacement: FiberId) -> Result<(), RenderError> {
        let (parent, sibling) = {
            let node = self.arena.node(previous)?;
            (node.parent.ok_or(RenderError::MissingNode(previous))?, node.sibling)
        };
        self.arena.node_mut(replacement)?.sibling = sibling;

        let parent_node = self.arena.node_mut(parent)?;
        if parent_node.child == Some(previous) {
            parent_node.child = Some(replacement);
            return Ok(());
        }

        let mut cursor = parent_node.child;
        while let Some(id) = cursor {
            let node = self.arena.node_mut(id)?;
            if node.sibling == Some(previous) {
                node.sibling = Some(replacement);
                return Ok(());
            }
            cursor = node.sibling;
        }
        Err(RenderError::MissingNode(previous))
    }

    /// The committed node currently holding `list`.
    fn find_hook_owner(&self, list: &Arc<Mutex<HookList>>) -> Option<FiberId> {
        let holds = |id: FiberId| {
            self.arena
                .get(id)
                .and_then(|node| node.hooks.as_ref())
                .is_some_and(|hooks| Arc::ptr_eq(hooks, list))
        };

        let owner = list.lock().owner();
        if holds(owner) {
            return Some(owner);
        }
        self.arena.ids().find(|&id| holds(id))
    }

    /// The host container of this root.
    pub fn container(&self) -> HostHandle {
        self.container
    }

    /// Root of the committed tree.
    pub fn current_root(&self) -> Option<FiberId> {
        self.current
    }

    /// Root of the pass in progress.
    pub fn work_in_progress_root(&self) -> Option<FiberId> {
        self.work_in_progress_root
    }

    /// Summary of the most recent successful commit.
    pub fn last_commit(&self) -> Option<&CommitSummary> {
        self.last_commit.as_ref()
    }

    /// Error of the most recent pass, if it failed.
    pub fn last_error(&self) -> Option<&RenderError> {
        self.last_error.as_ref()
    }

    /// Number of work nodes held, including retired versions not yet swept.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Snapshot of the committed tree.
    pub fn snapshot(&self) -> Option<FiberSnapshot> {
        self.current.and_then(|root| self.snapshot_node(root))
    }

    fn snapshot_node(&self, id: FiberId) -> Option<FiberSnapshot> {
        let node = self.arena.get(id)?;
        Some(FiberSnapshot {
            id,
            tag: node.tag,
            name: node.ty.name().to_string(),
            key: node.key.clone(),
            index: node.index,
            host: node.host_handle(),
            hooks: node.hooks.as_ref().map_or(0, |hooks| hooks.lock().len()),
            children: self
                .arena
                .children(id)
                .into_iter()
                .filter_map(|child| self.snapshot_node(child))
                .collect(),
        })
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("container", &self.container)
            .field("current", &self.current)
            .field("nodes", &self.arena.len())
            .finish()
    }
}
