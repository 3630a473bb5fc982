//! Trellis Core
//!
//! This crate provides the rendering engine for the Trellis UI framework.
//! It turns declarative tree descriptions into a mutable host tree and keeps
//! the two in sync with minimal host mutation. It implements:
//!
//! - A dual-version work tree (current / alternate)
//! - Keyed child-list reconciliation with move detection
//! - State, reducer and effect hooks for function components
//! - A depth-first work loop and commit walker
//! - A min-heap task scheduler behind a macrotask boundary
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `element`: Tree descriptions and component types
//! - `fiber`: Work nodes and the arena that owns them
//! - `reconciler`: Child diff, work loop, commit, and the per-root renderer
//! - `hooks`: Per-component state slots and effect queues
//! - `scheduler`: Deferred tasks and the macrotask boundary
//! - `host`: The host adapter trait and an in-memory document
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::prelude::*;
//!
//! let counter = FunctionComponent::new("Counter", |_, hooks| {
//!     let (count, set_count) = hooks.use_state(0i64)?;
//!     let click = Listener::new(move |_| {
//!         set_count.dispatch(count + 1);
//!     });
//!     Ok(Element::host("button").attr("onClick", click).children(count).into())
//! });
//!
//! let host = MemoryHost::new();
//! let container = host.create_container("div");
//! let (scheduler, _) = Scheduler::manual();
//! let root = create_root(host.clone(), container, &scheduler);
//!
//! root.render(counter.element());
//! scheduler.flush_work();
//! assert_eq!(host.inner_markup(container)?, "<button>0</button>");
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod reconciler;
pub mod root;
pub mod scheduler;

pub use config::{Config, RootConfig, SchedulerConfig};
pub use element::{
    ClassComponent, Children, Component, Element, ElementType, Event, FunctionComponent, Key,
    Listener, PropValue, Props, RenderResult,
};
pub use error::{HookError, HostError, RenderError};
pub use hooks::{Deps, Dispatch, Hooks, SetState};
pub use host::{Host, HostHandle, MemoryHost};
pub use reconciler::{CommitSummary, FiberSnapshot, Renderer};
pub use root::{create_root, Root};
pub use scheduler::{MacrotaskHost, ManualMacrotask, Scheduler, TokioMacrotask};

/// Everything needed to write components and mount a root.
pub mod prelude {
    pub use crate::deps;
    pub use crate::{
        create_root, Children, ClassComponent, Component, Deps, Element, Event,
        FunctionComponent, Hooks, Listener, MemoryHost, Props, RenderError, RenderResult, Root,
        Scheduler,
    };
}
