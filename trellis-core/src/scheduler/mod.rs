//! Task Scheduler
//!
//! Deferred callbacks wait in a min-heap ordered by `(sort_key, id)` until a
//! macrotask boundary fires and flushes them.
//!
//! # Algorithm
//!
//! 1. [`Scheduler::schedule_callback`] stamps the task with the current time
//!    as its sort key (there are no priorities or timeouts), pushes it, and
//!    arms the macrotask boundary unless one is already pending.
//!
//! 2. When the boundary fires, [`Scheduler::flush_work`] pops and runs tasks
//!    one at a time until the heap is empty. The queue lock is released while
//!    a task runs, so a task may schedule further tasks; they run in the same
//!    flush.
//!
//! 3. With `max_tasks_per_flush` set, a flush that hits the cap re-arms the
//!    boundary and returns, handing control back to the host.
//!
//! A popped task always runs to completion. Unpopped tasks cannot be
//! cancelled.

mod heap;
mod macrotask;
mod task;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::SchedulerConfig;

pub use heap::MinHeap;
pub use macrotask::{MacrotaskHost, ManualMacrotask, TokioMacrotask};
pub use task::{Task, TaskId};

struct TaskQueue {
    heap: MinHeap<Task>,
    next_id: u64,
    /// A flush has been requested and has not drained the heap yet.
    armed: bool,
}

struct SchedulerInner {
    queue: Mutex<TaskQueue>,
    host: Box<dyn MacrotaskHost>,
    epoch: Instant,
    config: SchedulerConfig,
}

/// Shared handle to a task queue and its macrotask boundary.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Create a scheduler flushing through `host`.
    pub fn new(host: impl MacrotaskHost + 'static) -> Self {
        Self::with_config(host, SchedulerConfig::default())
    }

    /// Create a scheduler with an explicit configuration.
    pub fn with_config(host: impl MacrotaskHost + 'static, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                queue: Mutex::new(TaskQueue {
                    heap: MinHeap::new(),
                    next_id: 1,
                    armed: false,
                }),
                host: Box::new(host),
                epoch: Instant::now(),
                config,
            }),
        }
    }

    /// A scheduler flushed by hand, plus the boundary to inspect requests.
    pub fn manual() -> (Self, ManualMacrotask) {
        let boundary = ManualMacrotask::new();
        (Self::new(boundary.clone()), boundary)
    }

    fn now(&self) -> u64 {
        u64::try_from(self.inner.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    /// Queue `callback` to run at the next flush.
    pub fn schedule_callback<F>(&self, callback: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let sort_key = self.now();
        let (id, arm) = {
            let mut queue = self.inner.queue.lock();
            let id = TaskId::new(queue.next_id);
            queue.next_id += 1;
            queue.heap.push(Task::new(id, sort_key, Box::new(callback)));
            let arm = !queue.armed;
            queue.armed = true;
            (id, arm)
        };
        tracing::trace!(task = id.raw(), sort_key, "task scheduled");

        if arm {
            self.inner.host.request_callback(self.clone());
        }
        id
    }

    /// Run queued tasks in order. Returns how many ran.
    pub fn flush_work(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut queue = self.inner.queue.lock();
                if queue.heap.is_empty() {
                    queue.armed = false;
                    return ran;
                }
                if self.inner.config.max_tasks_per_flush.is_some_and(|max| ran >= max) {
                    None
                } else {
                    queue.heap.pop()
                }
            };

            let Some(task) = task else {
                tracing::trace!(ran, "flush yielded with tasks pending");
                self.inner.host.request_callback(self.clone());
                return ran;
            };
            tracing::trace!(task = task.id().raw(), "running task");
            task.run();
            ran += 1;
        }
    }

    /// Tasks waiting in the heap.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().heap.len()
    }

    /// Whether a flush has been requested and not yet drained the heap.
    pub fn is_armed(&self) -> bool {
        self.inner.queue.lock().armed
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.inner.queue.lock();
        f.debug_struct("Scheduler")
            .field("pending", &queue.heap.len())
            .field("armed", &queue.armed)
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce() + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |n: u32| -> Box<dyn FnOnce() + Send> {
            let sink = sink.clone();
            Box::new(move || sink.lock().push(n))
        };
        (log, make)
    }

    #[test]
    fn tasks_wait_for_the_boundary() {
        let (scheduler, boundary) = Scheduler::manual();
        let (log, make) = recorder();

        scheduler.schedule_callback(make(1));
        scheduler.schedule_callback(make(2));

        assert!(log.lock().is_empty());
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(boundary.requests(), 1, "one boundary armed for both tasks");

        assert_eq!(scheduler.flush_work(), 2);
        assert_eq!(*log.lock(), vec![1, 2]);
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn boundary_rearms_after_a_drain() {
        let (scheduler, boundary) = Scheduler::manual();
        scheduler.schedule_callback(|| {});
        scheduler.flush_work();
        scheduler.schedule_callback(|| {});
        assert_eq!(boundary.requests(), 2);
    }

    #[test]
    fn tasks_scheduled_during_a_flush_run_in_it() {
        let (scheduler, boundary) = Scheduler::manual();
        let (log, make) = recorder();
        let inner = scheduler.clone();
        let later = make(2);
        scheduler.schedule_callback(move || {
            inner.schedule_callback(later);
        });
        scheduler.schedule_callback(make(1));

        assert_eq!(scheduler.flush_work(), 3);
        assert_eq!(*log.lock(), vec![1, 2]);
        assert_eq!(boundary.requests(), 1);
    }

    #[test]
    fn capped_flush_yields_to_the_host() {
        let boundary = ManualMacrotask::new();
        let scheduler = Scheduler::with_config(
            boundary.clone(),
            SchedulerConfig {
                max_tasks_per_flush: Some(2),
            },
        );
        let (log, make) = recorder();
        for n in 0..5 {
            scheduler.schedule_callback(make(n));
        }

        assert_eq!(scheduler.flush_work(), 2);
        assert_eq!(boundary.requests(), 2);
        assert!(scheduler.is_armed());
        assert_eq!(scheduler.flush_work(), 2);
        assert_eq!(scheduler.flush_work(), 1);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn task_ids_are_monotonic() {
        let (scheduler, _) = Scheduler::manual();
        let a = scheduler.schedule_callback(|| {});
        let b = scheduler.schedule_callback(|| {});
        assert!(a < b);
    }
}
