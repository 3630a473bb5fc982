//! Macrotask Boundary
//!
//! The scheduler never runs tasks inline. It asks a [`MacrotaskHost`] to call
//! [`Scheduler::flush_work`] later, once per armed boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::{Handle, TryCurrentError};

use super::Scheduler;

/// Something that can run a scheduler flush at a later point.
pub trait MacrotaskHost: Send + Sync {
    /// Arrange for `scheduler.flush_work()` to be called after the current
    /// call stack unwinds.
    fn request_callback(&self, scheduler: Scheduler);
}

/// Boundary driven by the embedder: requests are counted and the embedder
/// calls [`Scheduler::flush_work`] itself.
#[derive(Debug, Clone, Default)]
pub struct ManualMacrotask {
    requests: Arc<AtomicUsize>,
}

impl ManualMacrotask {
    /// Create a boundary with no requests recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total flush requests received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl MacrotaskHost for ManualMacrotask {
    fn request_callback(&self, _scheduler: Scheduler) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Boundary backed by a tokio runtime: each request runs a flush on the
/// blocking pool, so rendering never stalls an async worker.
#[derive(Debug, Clone)]
pub struct TokioMacrotask {
    handle: Handle,
}

impl TokioMacrotask {
    /// Flush on the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime this thread is running in.
    pub fn try_current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl MacrotaskHost for TokioMacrotask {
    fn request_callback(&self, scheduler: Scheduler) {
        self.handle.spawn_blocking(move || {
            scheduler.flush_work();
        });
    }
}
