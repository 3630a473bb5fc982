//! Work Loop
//!
//! Depth-first walk over the tree being built. Each unit of work renders one
//! node by kind and reconciles its output, which creates the node's children
//! before the walk descends into them.

use std::sync::Arc;

use super::child::reconcile_children;
use super::Renderer;
use crate::element::ElementType;
use crate::error::RenderError;
use crate::fiber::{FiberId, StateNode, WorkTag};
use crate::hooks::Hooks;
use crate::host::apply_props;

impl Renderer {
    /// Run every unit of work under `root`. Returns the number of units.
    pub(super) fn perform(&mut self, root: FiberId) -> Result<usize, RenderError> {
        let mut next = Some(root);
        let mut units = 0;
        while let Some(id) = next {
            next = self.perform_unit(id, root)?;
            units += 1;
        }
        Ok(units)
    }

    /// Render `id`, then pick the next unit: its first child, else the
    /// nearest sibling on the way back up to `root`.
    fn perform_unit(&mut self, id: FiberId, root: FiberId) -> Result<Option<FiberId>, RenderError> {
        self.begin_work(id)?;

        if let Some(child) = self.arena.node(id)?.child {
            return Ok(Some(child));
        }

        let mut cursor = id;
        loop {
            // the root's siblings are outside this pass
            if cursor == root {
                return Ok(None);
            }
            let node = self.arena.node(cursor)?;
            if let Some(sibling) = node.sibling {
                return Ok(Some(sibling));
            }
            match node.parent {
                Some(parent) => cursor = parent,
                None => return Ok(None),
            }
        }
    }

    fn begin_work(&mut self, id: FiberId) -> Result<(), RenderError> {
        let node = self.arena.node(id)?;
        let tag = node.tag;
        tracing::trace!(fiber = id.raw(), ?tag, name = node.ty.name(), "unit of work");

        match tag {
            WorkTag::HostPrimitive => self.update_host(id),
            WorkTag::Function => self.update_function(id),
            WorkTag::Class => self.update_class(id),
            WorkTag::Text => self.update_text(id),
            WorkTag::Fragment => {
                let children = self.arena.node(id)?.props.children().clone();
                reconcile_children(&mut self.arena, id, children.into_rendered())
            }
        }
    }

    fn update_host(&mut self, id: FiberId) -> Result<(), RenderError> {
        let node = self.arena.node(id)?;
        let props = Arc::clone(&node.props);

        if node.host_handle().is_none() {
            let tag = node.ty.name().to_string();
            let handle = self.host.create_element(&tag)?;
            apply_props(self.host.as_mut(), handle, None, &props)?;
            self.arena.node_mut(id)?.state_node = StateNode::Host(handle);
        }

        reconcile_children(&mut self.arena, id, props.children().clone())
    }

    fn update_function(&mut self, id: FiberId) -> Result<(), RenderError> {
        let node = self.arena.node(id)?;
        let ElementType::Function(component) = &node.ty else {
            return Err(RenderError::component(node.ty.name(), "not a function component"));
        };
        let component = component.clone();
        let props = Arc::clone(&node.props);
        let previous = node
            .alternate
            .and_then(|alternate| self.arena.get(alternate))
            .and_then(|previous| previous.hooks.clone());

        let mut hooks = Hooks::begin(
            id,
            previous,
            self.config.strict_hooks,
            Arc::clone(&self.schedule_update),
        );
        let output = component.render(&props, &mut hooks)?;
        let rendered = hooks.finish()?;

        let node = self.arena.node_mut(id)?;
        node.hooks = Some(rendered.list);
        node.layout_effects = rendered.layout_effects;
        node.passive_effects = rendered.passive_effects;
        node.slot_patch = Some(rendered.patch);

        reconcile_children(&mut self.arena, id, output.into_rendered())
    }

    fn update_class(&mut self, id: FiberId) -> Result<(), RenderError> {
        let node = self.arena.node(id)?;
        let props = Arc::clone(&node.props);

        let existing = match &node.state_node {
            StateNode::Instance(instance) => Some(Arc::clone(instance)),
            _ => None,
        };
        let instance = match existing {
            Some(instance) => instance,
            None => {
                let ElementType::Class(class) = &node.ty else {
                    return Err(RenderError::component(node.ty.name(), "not a class component"));
                };
                let instance = class.instantiate(&props);
                tracing::trace!(fiber = id.raw(), name = class.name(), "class instantiated");
                self.arena.node_mut(id)?.state_node = StateNode::Instance(Arc::clone(&instance));
                instance
            }
        };

        let output = instance.lock().render(&props)?;
        reconcile_children(&mut self.arena, id, output.into_rendered())
    }

    fn update_text(&mut self, id: FiberId) -> Result<(), RenderError> {
        let node = self.arena.node(id)?;
        if node.host_handle().is_none() {
            let text = node.props.children().as_text().unwrap_or_default().to_string();
            let handle = self.host.create_text(&text)?;
            self.arena.node_mut(id)?.state_node = StateNode::Host(handle);
        }
        Ok(())
    }
}
