//! Scheduled Tasks

use std::cmp::Ordering;
use std::fmt;

/// Monotonic task identifier; breaks ties between equal sort keys so tasks
/// scheduled at the same instant run in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The numeric value of the id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A deferred callback, ordered by `(sort_key, id)`.
pub struct Task {
    id: TaskId,
    sort_key: u64,
    callback: Box<dyn FnOnce() + Send>,
}

impl Task {
    pub(crate) fn new(id: TaskId, sort_key: u64, callback: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            id,
            sort_key,
            callback,
        }
    }

    /// The task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Microseconds since the scheduler started, at scheduling time.
    pub fn sort_key(&self) -> u64 {
        self.sort_key
    }

    pub(crate) fn run(self) {
        (self.callback)()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key == other.sort_key && self.id == other.id
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.sort_key, self.id).cmp(&(other.sort_key, other.id))
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("sort_key", &self.sort_key)
            .finish()
    }
}
