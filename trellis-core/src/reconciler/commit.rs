//! Commit
//!
//! A second depth-first pass over the finished tree that applies each node's
//! flags to the host tree and fires the effects queued during render. Every
//! node is handled before its children, and its flags are cleared once
//! applied. Hook slot writes staged by a function component's render land
//! in its slot list right before its effects fire.
//!
//! Host mutations are not transactional: a host failure aborts the commit
//! and leaves already applied mutations in place.

use std::sync::Arc;

use super::{CommitSummary, Renderer};
use crate::error::{HostError, RenderError};
use crate::fiber::{FiberId, Flags, WorkTag};
use crate::host::{apply_props, HostHandle};

impl Renderer {
    /// Apply the tree under `root` to the host.
    pub(super) fn commit(&mut self, root: FiberId) -> Result<CommitSummary, RenderError> {
        let _span = tracing::debug_span!("commit", root = root.raw()).entered();

        let mut summary = CommitSummary::default();
        self.commit_node(root, &mut summary)?;
        self.work_in_progress_root = None;

        tracing::debug!(
            placed = summary.placed.len(),
            updated = summary.updated.len(),
            deleted = summary.deleted.len(),
            effects = summary.effects_fired,
            "commit complete"
        );
        Ok(summary)
    }

    fn commit_node(&mut self, id: FiberId, summary: &mut CommitSummary) -> Result<(), RenderError> {
        let node = self.arena.node(id)?;
        let flags = node.flags;
        let tag = node.tag;
        let key = node.key.clone();

        if flags.contains(Flags::PLACEMENT) {
            self.commit_placement(id)?;
            summary.placed.push(key.clone());
        }
        if flags.contains(Flags::UPDATE) {
            self.commit_update(id)?;
            summary.updated.push(key);
        }

        let deletions = std::mem::take(&mut self.arena.node_mut(id)?.deletions);
        for deleted in deletions {
            self.commit_deletion(id, deleted, summary)?;
        }

        if tag == WorkTag::Function {
            let node = self.arena.node_mut(id)?;
            if let (Some(patch), Some(hooks)) = (node.slot_patch.take(), node.hooks.as_ref()) {
                patch.apply(&mut hooks.lock());
            }
            let layout = std::mem::take(&mut node.layout_effects);
            let passive = std::mem::take(&mut node.passive_effects);
            for effect in layout.into_iter().chain(passive) {
                effect.run();
                summary.effects_fired += 1;
            }
        }

        self.arena.node_mut(id)?.flags = Flags::empty();

        let mut child = self.arena.node(id)?.child;
        while let Some(current) = child {
            self.commit_node(current, summary)?;
            child = self.arena.node(current)?.sibling;
        }
        Ok(())
    }

    fn commit_placement(&mut self, id: FiberId) -> Result<(), RenderError> {
        let parent = self.host_parent(id)?;
        let anchor = self.find_anchor(id)?;

        let node = self.arena.node(id)?;
        let handles = match node.host_handle() {
            Some(handle) => vec![handle],
            // a moved component or fragment carries its settled host nodes along
            None if node.alternate.is_some() => {
                let mut handles = Vec::new();
                self.collect_hosts(id, true, &mut handles)?;
                handles
            }
            None => Vec::new(),
        };

        for handle in handles {
            match anchor {
                Some(anchor) => self.host.insert_before(parent, handle, anchor)?,
                None => self.host.append_child(parent, handle)?,
            }
        }
        Ok(())
    }

    fn commit_update(&mut self, id: FiberId) -> Result<(), RenderError> {
        let node = self.arena.node(id)?;
        let Some(handle) = node.host_handle() else {
            return Ok(());
        };
        let next = Arc::clone(&node.props);
        let previous = node
            .alternate
            .and_then(|alternate| self.arena.get(alternate))
            .map(|previous| Arc::clone(&previous.props));

        match node.tag {
            WorkTag::HostPrimitive => {
                let writes = apply_props(self.host.as_mut(), handle, previous.as_deref(), &next)?;
                if writes > 0 {
                    tracing::trace!(fiber = id.raw(), writes, "props updated");
                }
            }
            WorkTag::Text => {
                let text = next.children().as_text().unwrap_or_default();
                if previous.as_ref().and_then(|p| p.children().as_text()) != Some(text) {
                    self.host.set_text_content(handle, text)?;
                }
            }
            WorkTag::Function | WorkTag::Class | WorkTag::Fragment => {}
        }
        Ok(())
    }

    fn commit_deletion(
        &mut self,
        parent: FiberId,
        deleted: FiberId,
        summary: &mut CommitSummary,
    ) -> Result<(), RenderError> {
        let target = match self.arena.node(parent)?.host_handle() {
            Some(handle) => handle,
            None => self.host_parent(parent)?,
        };

        let node = self.arena.node(deleted)?;
        let key = node.key.clone();
        let handles = match node.host_handle() {
            Some(handle) => vec![handle],
            None => {
                let mut handles = Vec::new();
                self.collect_hosts(deleted, false, &mut handles)?;
                handles
            }
        };

        for handle in handles {
            self.host.remove_child(target, handle)?;
        }
        summary.deleted.push(key);
        Ok(())
    }

    /// Nearest ancestor host handle of `id`.
    fn host_parent(&self, id: FiberId) -> Result<HostHandle, RenderError> {
        let mut cursor = self.arena.node(id)?.parent;
        while let Some(ancestor) = cursor {
            let node = self.arena.node(ancestor)?;
            if let Some(handle) = node.host_handle() {
                return Ok(handle);
            }
            cursor = node.parent;
        }
        Err(HostError::MissingContainer(id).into())
    }

    /// Host handle the node's host content must be inserted before, or
    /// `None` to append.
    ///
    /// The first settled host among the following siblings wins. When the
    /// sibling run has none and the parent owns no host handle, the search
    /// continues after the parent.
    fn find_anchor(&self, id: FiberId) -> Result<Option<HostHandle>, RenderError> {
        let mut cursor = id;
        loop {
            let mut sibling = self.arena.node(cursor)?.sibling;
            while let Some(current) = sibling {
                if let Some(handle) = self.settled_host(current)? {
                    return Ok(Some(handle));
                }
                sibling = self.arena.node(current)?.sibling;
            }

            let Some(parent) = self.arena.node(cursor)?.parent else {
                return Ok(None);
            };
            if self.arena.node(parent)?.host_handle().is_some() {
                return Ok(None);
            }
            cursor = parent;
        }
    }

    /// First host handle at or below `id` that is already in place.
    fn settled_host(&self, id: FiberId) -> Result<Option<HostHandle>, RenderError> {
        let node = self.arena.node(id)?;
        if node.flags.contains(Flags::PLACEMENT) {
            return Ok(None);
        }
        if let Some(handle) = node.host_handle() {
            return Ok(Some(handle));
        }
        let mut child = node.child;
        while let Some(current) = child {
            if let Some(handle) = self.settled_host(current)? {
                return Ok(Some(handle));
            }
            child = self.arena.node(current)?.sibling;
        }
        Ok(None)
    }

    /// Top-level host handles below `id`, in order. With `settled_only`,
    /// subtrees flagged for placement are skipped.
    fn collect_hosts(
        &self,
        id: FiberId,
        settled_only: bool,
        out: &mut Vec<HostHandle>,
    ) -> Result<(), RenderError> {
        let mut child = self.arena.node(id)?.child;
        while let Some(current) = child {
            let node = self.arena.node(current)?;
            if !(settled_only && node.flags.contains(Flags::PLACEMENT)) {
                match node.host_handle() {
                    Some(handle) => out.push(handle),
                    None => self.collect_hosts(current, settled_only, out)?,
                }
            }
            child = node.sibling;
        }
        Ok(())
    }
}
