//! Error Types
//!
//! Every fallible operation in the engine returns one of these. Host adapter
//! failures and hook-order violations are kept separate so callers can tell a
//! broken platform apart from a broken component.

use thiserror::Error;

use crate::fiber::FiberId;
use crate::host::HostHandle;

/// Failure reported by a host adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The handle was never created by this host, or has been discarded.
    #[error("unknown host handle {0:?}")]
    UnknownHandle(HostHandle),

    /// `child` is not currently attached under `parent`.
    #[error("host handle {child:?} is not a child of {parent:?}")]
    NotAChild {
        parent: HostHandle,
        child: HostHandle,
    },

    /// Text handles cannot hold children or attributes.
    #[error("host handle {0:?} is a text node")]
    TextNode(HostHandle),

    /// No ancestor of the work node owns a host handle to mutate.
    #[error("work node {0:?} has no host container above it")]
    MissingContainer(FiberId),
}

/// A component called its hooks in a different order or number than during
/// its previous render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    /// The slot at `index` holds a different kind of hook.
    #[error("hook {index} changed from {previous} to {current} between renders")]
    OrderMismatch {
        index: usize,
        previous: &'static str,
        current: &'static str,
    },

    /// The component called more hooks than during its previous render.
    #[error("rendered more hooks than during the previous render (hook {index})")]
    ExtraHook { index: usize },

    /// The component called fewer hooks than during its previous render.
    #[error("rendered {rendered} hooks, previous render used {expected}")]
    MissingHooks { expected: usize, rendered: usize },
}

/// Failure of a render or commit pass.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Host(#[from] HostError),

    /// A link in the work tree pointed at a node that is no longer stored.
    #[error("work node {0:?} is missing from the arena")]
    MissingNode(FiberId),

    /// Reported by component code.
    #[error("component `{name}` failed: {message}")]
    Component { name: String, message: String },
}

impl RenderError {
    /// Build a component failure.
    pub fn component(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Component {
            name: name.into(),
            message: message.into(),
        }
    }
}
