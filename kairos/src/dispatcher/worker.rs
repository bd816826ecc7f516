use super::injector::Injector;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A thread of a [`ThreadPool`](super::ThreadPool).
///
/// Workers share a single FIFO injector; there are no per-worker queues
/// and no stealing.
pub(crate) struct Worker {
    /// Index of the worker inside its pool.
    id: usize,

    /// Name of the owning pool, for diagnostics.
    pool: Arc<str>,

    /// Queue the worker drains.
    injector: Arc<Injector>,
}

impl Worker {
    pub(crate) fn new(id: usize, pool: Arc<str>, injector: Arc<Injector>) -> Self {
        Self { id, pool, injector }
    }

    /// Runs jobs until the pool shuts down and its queue is empty.
    ///
    /// A panicking job is logged and does not take the worker down. Task
    /// bodies catch their own panics, so only raw dispatched work gets here.
    pub(crate) fn run(self) {
        tracing::trace!(pool = %self.pool, worker = self.id, "worker started");

        while let Some(job) = self.injector.pop() {
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                tracing::error!(pool = %self.pool, worker = self.id, "dispatched job panicked");
            }
        }

        tracing::trace!(pool = %self.pool, worker = self.id, "worker stopped");
    }
}
