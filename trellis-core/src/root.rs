//! Roots
//!
//! A [`Root`] binds a host container to a [`Renderer`] and a [`Scheduler`].
//! Rendering is always deferred: [`Root::render`] and every state dispatch
//! enqueue a task, and the work happens when the scheduler flushes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::{Config, RootConfig};
use crate::element::Children;
use crate::error::RenderError;
use crate::hooks::{HookList, ScheduleUpdate};
use crate::host::{Host, HostHandle};
use crate::reconciler::{CommitSummary, FiberSnapshot, Renderer};
use crate::scheduler::{Scheduler, TaskId};

/// Create a root rendering into `container` with the default configuration.
pub fn create_root(host: impl Host + 'static, container: HostHandle, scheduler: &Scheduler) -> Root {
    Root::with_config(host, container, scheduler, RootConfig::default())
}

/// Handle to a mounted UI tree.
#[derive(Clone)]
pub struct Root {
    renderer: Arc<Mutex<Renderer>>,
    scheduler: Scheduler,
}

impl Root {
    /// Create a root with an explicit configuration.
    pub fn with_config(
        host: impl Host + 'static,
        container: HostHandle,
        scheduler: &Scheduler,
        config: RootConfig,
    ) -> Self {
        let renderer = Arc::new_cyclic(|weak: &Weak<Mutex<Renderer>>| {
            let schedule_update = hook_updates(weak.clone(), scheduler.clone());
            Mutex::new(Renderer::new(Box::new(host), container, config, schedule_update))
        });
        Self {
            renderer,
            scheduler: scheduler.clone(),
        }
    }

    /// Build a root from the `root` section of a [`Config`]. The `scheduler`
    /// section is consumed by [`Scheduler::with_config`].
    pub fn from_config(
        host: impl Host + 'static,
        container: HostHandle,
        scheduler: &Scheduler,
        config: &Config,
    ) -> Self {
        Self::with_config(host, container, scheduler, config.root.clone())
    }

    /// Schedule a render of `children` into the container.
    pub fn render(&self, children: impl Into<Children>) -> TaskId {
        let children = children.into();
        let renderer = Arc::downgrade(&self.renderer);
        self.scheduler.schedule_callback(move || {
            let Some(renderer) = renderer.upgrade() else {
                return;
            };
            // failures are logged and recorded by the renderer
            let _ = renderer.lock().render_root(children);
        })
    }

    /// Schedule removal of everything rendered into the container.
    pub fn unmount(&self) -> TaskId {
        self.render(Children::Empty)
    }

    /// The scheduler running this root's tasks.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The host container this root renders into.
    pub fn container(&self) -> HostHandle {
        self.renderer.lock().container()
    }

    /// Summary of the most recent successful commit.
    pub fn last_commit(&self) -> Option<CommitSummary> {
        self.renderer.lock().last_commit().cloned()
    }

    /// Error of the most recent pass, if it failed.
    pub fn last_error(&self) -> Option<RenderError> {
        self.renderer.lock().last_error().cloned()
    }

    /// Snapshot of the committed work tree.
    pub fn work_tree(&self) -> Option<FiberSnapshot> {
        self.renderer.lock().snapshot()
    }
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Root")
            .field("renderer", &*self.renderer.lock())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// The scheduling side of state dispatch: queue a re-render of whichever
/// node owns the dispatched slot list.
fn hook_updates(renderer: Weak<Mutex<Renderer>>, scheduler: Scheduler) -> ScheduleUpdate {
    Arc::new(move |hooks: Weak<Mutex<HookList>>| {
        let renderer = renderer.clone();
        scheduler.schedule_callback(move || {
            let Some(renderer) = renderer.upgrade() else {
                return;
            };
            let result = renderer.lock().rerender_hook_owner(hooks);
            if let Err(err) = result {
                tracing::error!(error = %err, "scheduled component update failed");
            }
        });
    })
}
